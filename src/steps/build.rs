//! Lint and asset compilation steps.

use std::sync::Arc;

use crate::context::RunContext;
use crate::pipeline::StepOutcome;
use crate::steps::shell;
use crate::{shlog, Result};

pub async fn lint_scripts(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    shell::sh(&ctx.config.commands.lint_scripts, &ctx.root).await?;
    Ok(StepOutcome::Continue)
}

pub async fn lint_styles(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    shell::sh(&ctx.config.commands.lint_styles, &ctx.root).await?;
    Ok(StepOutcome::Continue)
}

/// Compile assets, then minify unless minification is off or watch mode is
/// on. Marks the run as built, so a deploy pipeline composed afterwards in
/// the same process leaves its build step out.
pub async fn build(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let opts = ctx.opts().await;
    shell::sh(&ctx.config.commands.build, &ctx.root).await?;
    if opts.minify && !opts.watching {
        shell::sh(&ctx.config.commands.minify, &ctx.root).await?;
    }
    ctx.update(|o| o.built = true).await;
    shlog!("build complete");
    Ok(StepOutcome::Continue)
}
