//! Packaging and repository deploy steps.
//!
//! Staging copies the plugin tree into the build directory, the zip step
//! shells out to `zip` (checked earlier by the tools precondition), and the
//! deploy variants push the result to git/GitHub, WordPress.org SVN, or a
//! sibling repository directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::context::RunContext;
use crate::pipeline::StepOutcome;
use crate::steps::{preconditions, rewrite, shell};
use crate::util;
use crate::{shlog, shlog_debug, Error, Result};

/// Copy the plugin tree into `build/<slug>/`, leaving development paths out.
pub async fn stage(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let root = ctx.root.clone();
    let dest = ctx.stage_dir();
    let exclude = ctx.config.exclude.clone();
    let build_dir_name = ctx.config.build_dir.clone();
    shlog!("staging {} -> {}", root.display(), dest.display());

    let copied = util::blocking(move || {
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        fs::create_dir_all(&dest)?;
        copy_tree(&root, &dest, &|name| {
            exclude.iter().any(|e| e == name) || name == build_dir_name || name.starts_with('.')
        })
    })
    .await?;

    shlog!("staged {} file(s)", copied);
    Ok(StepOutcome::Continue)
}

/// Produce `build/<slug>.zip` from the staged tree.
pub async fn zip_package(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let zip = ctx.zip_path();
    if zip.exists() {
        tokio::fs::remove_file(&zip).await?;
    }
    let zip_name = format!("{}.zip", ctx.config.slug);
    shell::run(
        "zip",
        &["-rq", zip_name.as_str(), ctx.config.slug.as_str()],
        &ctx.build_dir(),
    )
    .await?;
    shlog!("packaged {}", zip.display());
    Ok(StepOutcome::Continue)
}

/// Copy the staged tree into the configured sibling repository directory.
pub async fn copy_to_repo(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let target = ctx
        .config
        .copy_dir
        .clone()
        .ok_or_else(|| Error::Validation("`copy_dir` is not configured".to_string()))?;
    let target = ctx.root.join(target);
    if ctx.opts().await.dry_run {
        shlog!("dry run: would copy staged tree to {}", target.display());
        return Ok(StepOutcome::Continue);
    }

    let stage = ctx.stage_dir();
    let copied = util::blocking(move || {
        fs::create_dir_all(&target)?;
        copy_tree(&stage, &target, &|_| false)
    })
    .await?;

    shlog!("copied {} file(s) to repository", copied);
    Ok(StepOutcome::Continue)
}

/// Commit, tag and push the release through git.
pub async fn git_release(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let version = rewrite::release_version(&ctx).await?;
    let tag = format!("v{}", version);
    if ctx.opts().await.dry_run {
        shlog!("dry run: would commit, tag and push {}", tag);
        return Ok(StepOutcome::Continue);
    }

    let root = &ctx.root;
    let message = format!("Release {}", version);

    let status = shell::run("git", &["status", "--porcelain"], root).await?;
    if status.stdout.trim().is_empty() {
        shlog_debug!("nothing to commit before {}", tag);
    } else {
        shell::run("git", &["add", "-A"], root).await?;
        shell::run("git", &["commit", "-m", message.as_str()], root).await?;
    }
    shell::run(
        "git",
        &["tag", "-a", tag.as_str(), "-m", message.as_str()],
        root,
    )
    .await?;
    shell::run("git", &["push"], root).await?;
    shell::run("git", &["push", "--tags"], root).await?;

    shlog!("pushed {}", tag);
    Ok(StepOutcome::Continue)
}

/// Commit trunk and the release tag to the WordPress.org SVN repository.
pub async fn svn_deploy(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let svn = ctx
        .config
        .svn
        .clone()
        .ok_or_else(|| Error::Validation("`[svn]` is not configured".to_string()))?;
    let version = rewrite::release_version(&ctx).await?;
    if ctx.opts().await.dry_run {
        shlog!("dry run: would commit trunk and tags/{} to {}", version, svn.url);
        return Ok(StepOutcome::Continue);
    }

    let username = std::env::var(preconditions::SVN_USERNAME)
        .map_err(|_| Error::MissingEnv(preconditions::SVN_USERNAME.to_string()))?;

    let checkout = tempfile::tempdir()?;
    let co_path = checkout.path().join("svn");
    let co_str = co_path.to_string_lossy().into_owned();

    shlog!("checking out {}", svn.url);
    shell::run(
        "svn",
        &[
            "checkout",
            svn.url.as_str(),
            co_str.as_str(),
            "--depth",
            "immediates",
        ],
        &ctx.root,
    )
    .await?;
    shell::run("svn", &["update", "--set-depth", "infinity", "trunk"], &co_path).await?;

    // Mirror the staged tree into trunk.
    let trunk = co_path.join("trunk");
    let stage = ctx.stage_dir();
    util::blocking(move || {
        clear_dir(&trunk)?;
        copy_tree(&stage, &trunk, &|_| false)
    })
    .await?;

    shell::run("svn", &["add", "--force", "."], &co_path).await?;
    let tag_path = format!("tags/{}", version);
    shell::run("svn", &["copy", "trunk", tag_path.as_str()], &co_path).await?;

    let message = format!("Release {}", version);
    shell::run(
        "svn",
        &[
            "commit",
            "-m",
            message.as_str(),
            "--username",
            username.as_str(),
            "--non-interactive",
        ],
        &co_path,
    )
    .await?;

    shlog!("committed {} to WordPress.org", version);
    Ok(StepOutcome::Continue)
}

/// Recursively copy `src` into `dest`. The skip predicate applies only to
/// top-level entries; deeper paths are plugin content and copy verbatim.
/// Symlinks are left behind. Returns the number of files copied.
fn copy_tree(src: &Path, dest: &Path, skip: &dyn Fn(&str) -> bool) -> Result<usize> {
    copy_tree_inner(src, dest, skip, true)
}

fn copy_tree_inner(
    src: &Path,
    dest: &Path,
    skip: &dyn Fn(&str) -> bool,
    top: bool,
) -> Result<usize> {
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if top && skip(&name.to_string_lossy()) {
            continue;
        }
        let dest_path = dest.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
            copied += copy_tree_inner(&entry.path(), &dest_path, skip, false)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dest_path)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Empty a directory, keeping the `.svn` administrative directory.
fn clear_dir(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy() == ".svn" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
