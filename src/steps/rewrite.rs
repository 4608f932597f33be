//! In-place source rewrites for version and metadata substitution.
//!
//! Every rewrite is atomic per file: the new content goes to a temp file in
//! the same directory and replaces the original only once fully written. A
//! substitution whose pattern matches nothing is an error, raised before
//! anything is written, so a failed rewrite never leaves a file half done.

use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::context::RunContext;
use crate::pipeline::StepOutcome;
use crate::util;
use crate::{shlog, Error, Result};

/// One regex substitution applied to a file.
pub struct Substitution {
    pub pattern: Regex,
    pub replacement: String,
}

impl Substitution {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }
}

/// Apply substitutions to a file, atomically. Returns the match count.
///
/// Fails with [`Error::PatternUnmatched`] if any substitution matches
/// nothing; the file is untouched in that case.
pub async fn rewrite_file(path: &Path, subs: Vec<Substitution>) -> Result<usize> {
    let content = tokio::fs::read_to_string(path).await?;

    let mut updated = content.clone();
    let mut replaced = 0usize;
    for sub in &subs {
        let matches = sub.pattern.find_iter(&updated).count();
        if matches == 0 {
            return Err(Error::PatternUnmatched {
                file: path.to_path_buf(),
                pattern: sub.pattern.to_string(),
            });
        }
        updated = sub
            .pattern
            .replace_all(&updated, sub.replacement.as_str())
            .into_owned();
        replaced += matches;
    }

    if updated == content {
        // Substituting the value already in place; nothing to write.
        return Ok(replaced);
    }

    let path = path.to_path_buf();
    util::blocking(move || {
        let dir = path.parent().ok_or_else(|| {
            Error::Validation(format!("{} has no parent directory", path.display()))
        })?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, updated.as_bytes())?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    })
    .await?;

    Ok(replaced)
}

/// Version currently declared in the main plugin file header.
pub async fn current_version(ctx: &RunContext) -> Result<String> {
    let content = tokio::fs::read_to_string(ctx.main_file_path()).await?;
    let pattern = Regex::new(r"(?m)^\s*\*?\s*Version:\s*(\S+)")?;
    pattern
        .captures(&content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::MarkerMissing {
            file: ctx.config.main_file(),
            marker: "Version: header".to_string(),
        })
}

/// The version this run releases: the explicit `--version` when given,
/// otherwise whatever the plugin header currently declares.
pub async fn release_version(ctx: &RunContext) -> Result<String> {
    if let Some(version) = ctx.opts().await.version {
        return Ok(version);
    }
    current_version(ctx).await
}

/// Rewrite the release version into the plugin header, the PHP version
/// constant (when the plugin defines one), `Stable tag:` in readme.txt and
/// `package.json` (when the project has one).
pub async fn bump_versions(ctx: Arc<RunContext>) -> Result<StepOutcome> {
    let version = release_version(&ctx).await?;
    shlog!("bumping version strings to {}", version);
    let mut files = 0usize;

    let main = ctx.main_file_path();
    let content = tokio::fs::read_to_string(&main).await?;
    let mut subs = vec![Substitution::new(
        r"(?m)^(?P<prefix>\s*\*?\s*Version:\s*)\S+",
        format!("${{prefix}}{}", version),
    )?];
    let constant = ctx.config.version_constant();
    if content.contains(&constant) {
        subs.push(Substitution::new(
            &format!(
                r"(?P<prefix>define\(\s*'{}',\s*')[^']+(?P<suffix>'\s*\))",
                regex::escape(&constant)
            ),
            format!("${{prefix}}{}${{suffix}}", version),
        )?);
    }
    rewrite_file(&main, subs).await?;
    files += 1;

    rewrite_file(
        &ctx.readme_path(),
        vec![Substitution::new(
            r"(?m)^(?P<prefix>Stable tag:\s*)\S+",
            format!("${{prefix}}{}", version),
        )?],
    )
    .await?;
    files += 1;

    let package_json = ctx.root.join("package.json");
    if package_json.exists() {
        rewrite_file(
            &package_json,
            vec![Substitution::new(
                r#"(?P<prefix>"version":\s*")[^"]+(?P<suffix>")"#,
                format!("${{prefix}}{}${{suffix}}", version),
            )?],
        )
        .await?;
        files += 1;
    }

    shlog!("rewrote {} file(s)", files);
    Ok(StepOutcome::Continue)
}

/// Rewrite the `Tested up to:` line in readme.txt, and `WC tested up to:`
/// when the readme carries one.
pub async fn apply_tested_up_to(ctx: &RunContext, wp: &str, wc: Option<&str>) -> Result<usize> {
    let readme = ctx.readme_path();
    let content = tokio::fs::read_to_string(&readme).await?;

    let mut subs = vec![Substitution::new(
        r"(?m)^(?P<prefix>Tested up to:\s*)\S+",
        format!("${{prefix}}{}", wp),
    )?];
    if let Some(wc) = wc {
        if content.contains("WC tested up to:") {
            subs.push(Substitution::new(
                r"(?m)^(?P<prefix>WC tested up to:\s*)\S+",
                format!("${{prefix}}{}", wc),
            )?);
        }
    }
    rewrite_file(&readme, subs).await
}
