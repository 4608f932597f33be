//! The named tasks shipwright knows about, and the deploy pipeline builder.

use crate::context::{DeployTarget, Options};
use crate::pipeline::{composed, op, parallel, series, Registry};
use crate::steps::{build, package, preconditions, remote, rewrite};
use crate::Result;

/// Register every task into a fresh registry.
pub fn register_all(reg: &mut Registry) -> Result<()> {
    // Preconditions.
    reg.register("check-env", op(preconditions::check_env))?;
    reg.register("check-tools", op(preconditions::check_tools))?;
    reg.register("check-worktree", op(preconditions::check_worktree))?;
    reg.register("check-release-marker", op(preconditions::check_release_marker))?;
    reg.register("confirm-release", op(preconditions::confirm_release))?;
    reg.register(
        "preflight",
        series([
            "check-env",
            "check-tools",
            "check-worktree",
            "check-release-marker",
        ]),
    )?;

    // Lint and build.
    reg.register("lint-scripts", op(build::lint_scripts))?;
    reg.register("lint-styles", op(build::lint_styles))?;
    reg.register("lint", parallel(["lint-scripts", "lint-styles"]))?;
    reg.register("build", op(build::build))?;

    // Version metadata.
    reg.register("bump-versions", op(rewrite::bump_versions))?;
    reg.register("tested-up-to", op(remote::tested_up_to))?;

    // Packaging.
    reg.register("stage", op(package::stage))?;
    reg.register("zip-package", op(package::zip_package))?;
    reg.register("package", series(["stage", "zip-package"]))?;

    // Deploy variants.
    reg.register("git-release", op(package::git_release))?;
    reg.register("github-release", op(remote::github_release))?;
    reg.register("svn-deploy", op(package::svn_deploy))?;
    reg.register("copy-to-repo", op(package::copy_to_repo))?;
    reg.register("trello-card", op(remote::trello_comment))?;

    reg.register("deploy", composed(deploy_steps))?;

    Ok(())
}

/// Build the deploy pipeline for the current options.
///
/// Preconditions come first, so nothing is spawned or mutated when the
/// environment is not ready. The list is fixed before execution starts;
/// flags the steps write afterwards (such as `built`) only affect pipelines
/// composed later.
pub fn deploy_steps(opts: &Options) -> Vec<String> {
    let mut steps = vec![
        "check-env",
        "check-tools",
        "check-worktree",
        "check-release-marker",
        "confirm-release",
    ];

    if !opts.built {
        steps.push("build");
    }
    steps.push("bump-versions");
    steps.push("tested-up-to");
    steps.push("package");

    match opts.target {
        DeployTarget::WpOrg => steps.push("svn-deploy"),
        DeployTarget::GitHub => {
            steps.push("git-release");
            steps.push("github-release");
        }
        DeployTarget::Copy => steps.push("copy-to-repo"),
    }
    steps.push("trello-card");

    steps.into_iter().map(String::from).collect()
}
