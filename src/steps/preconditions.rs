//! Checks that gate a deploy before anything is mutated.
//!
//! Each check is a first-class pipeline step: it either passes or fails the
//! whole run. The deploy pipeline puts these ahead of every side-effecting
//! step, so a missing credential or a dirty working copy stops the run
//! before a single shell command is spawned.

use git2::{Repository, StatusOptions};
use std::sync::Arc;

use crate::context::{DeployTarget, RunContext};
use crate::pipeline::StepOutcome;
use crate::steps::rewrite;
use crate::util;
use crate::{shlog, shlog_debug, Error, Result};

pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const SVN_USERNAME: &str = "SVN_USERNAME";
pub const TRELLO_KEY: &str = "TRELLO_KEY";
pub const TRELLO_TOKEN: &str = "TRELLO_TOKEN";

/// Environment variables the current target and configuration require.
pub fn required_env(ctx: &RunContext, target: DeployTarget) -> Vec<&'static str> {
    let mut required = Vec::new();
    match target {
        DeployTarget::GitHub => required.push(GITHUB_TOKEN),
        DeployTarget::WpOrg => required.push(SVN_USERNAME),
        DeployTarget::Copy => {}
    }
    if ctx.config.trello.is_some() {
        required.push(TRELLO_KEY);
        required.push(TRELLO_TOKEN);
    }
    required
}

/// Fail when any required environment variable is unset or empty.
pub async fn check_env(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let target = ctx.opts().await.target;
    let missing: Vec<&str> = required_env(&ctx, target)
        .into_iter()
        .filter(|name| std::env::var(name).map(|v| v.is_empty()).unwrap_or(true))
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingEnv(missing.join(", ")));
    }
    shlog_debug!("environment ok for target {}", target);
    Ok(StepOutcome::Continue)
}

/// Fail when a required external binary is not on PATH.
pub async fn check_tools(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let target = ctx.opts().await.target;
    let mut tools = vec!["git", "zip"];
    if target == DeployTarget::WpOrg {
        tools.push("svn");
    }
    for tool in tools {
        which::which(tool).map_err(|_| Error::ToolMissing(tool.to_string()))?;
    }
    Ok(StepOutcome::Continue)
}

/// Fail when the local working copy has uncommitted changes.
///
/// Untracked files are allowed; a deploy only cares that tracked content
/// matches what git will tag.
pub async fn check_worktree(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let root = ctx.root.clone();
    util::blocking(move || {
        let repo = Repository::discover(&root)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = repo.statuses(Some(&mut opts))?;
        let changes = statuses.len();
        if changes > 0 {
            return Err(Error::DirtyWorkTree { changes });
        }
        Ok(())
    })
    .await?;
    shlog_debug!("working copy clean");
    Ok(StepOutcome::Continue)
}

/// Fail unless readme.txt already documents the release in its changelog.
pub async fn check_release_marker(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let version = rewrite::release_version(&ctx).await?;
    let content = tokio::fs::read_to_string(ctx.readme_path()).await?;
    let marker = format!("= {} =", version);
    if !content.contains(&marker) {
        return Err(Error::MarkerMissing {
            file: "readme.txt".to_string(),
            marker: format!("changelog entry {}", marker),
        });
    }
    shlog_debug!("changelog documents {}", version);
    Ok(StepOutcome::Continue)
}

/// Interactive gate: print the release summary and ask before going on.
///
/// Answering no ends the pipeline early as a success; nothing after this
/// step runs. Skipped entirely under `--yes`.
pub async fn confirm_release(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let opts = ctx.opts().await;
    if opts.assume_yes {
        return Ok(StepOutcome::Continue);
    }

    let version = rewrite::release_version(&ctx).await?;
    println!(
        "Deploying {} {} (target: {})",
        ctx.config.slug, version, opts.target
    );
    print!("Continue? [y/N] ");
    std::io::Write::flush(&mut std::io::stdout())?;

    let input = util::prompt_line().await?.to_lowercase();
    if input == "y" || input == "yes" {
        Ok(StepOutcome::Continue)
    } else {
        println!("Deploy skipped.");
        shlog!("deploy skipped by operator");
        Ok(StepOutcome::SkipRest)
    }
}
