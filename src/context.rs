//! Shared state for one pipeline invocation.
//!
//! Every step receives the same [`RunContext`]: the immutable project
//! [`Config`], the project root, and the mutable [`Options`] bag. The bag
//! is the only inter-task communication channel; a write committed by one
//! sequential step is visible to every step that runs after it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};

/// Unique identifier for a pipeline invocation, used in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a deploy ships the release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployTarget {
    /// Commit trunk + tag to the WordPress.org SVN repository.
    WpOrg,
    /// Push to git and create a GitHub release with the zip attached.
    GitHub,
    /// Copy the staged build into a sibling repository directory.
    Copy,
}

impl std::fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployTarget::WpOrg => write!(f, "wporg"),
            DeployTarget::GitHub => write!(f, "github"),
            DeployTarget::Copy => write!(f, "copy"),
        }
    }
}

impl FromStr for DeployTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wporg" => Ok(DeployTarget::WpOrg),
            "github" => Ok(DeployTarget::GitHub),
            "copy" => Ok(DeployTarget::Copy),
            other => Err(Error::Validation(format!(
                "Unknown deploy target '{}' (expected wporg, github or copy)",
                other
            ))),
        }
    }
}

/// Mutable per-invocation flags and values, shared across all steps.
///
/// Pipeline builders read this to decide which steps to include; steps
/// read and write it through [`RunContext::opts`] / [`RunContext::update`].
#[derive(Debug, Clone)]
pub struct Options {
    pub target: DeployTarget,
    /// Release version. When unset, steps fall back to the version in the
    /// main plugin file header.
    pub version: Option<String>,
    pub minify: bool,
    /// Override of the configured GitHub owner/repo.
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Skip interactive confirmations.
    pub assume_yes: bool,
    /// Log remote side effects without performing them.
    pub dry_run: bool,
    /// Set by the build task once assets have been compiled this run, so a
    /// deploy pipeline composed afterwards leaves the build step out.
    pub built: bool,
    /// Set by watch mode; the build task skips minification while watching.
    pub watching: bool,
    /// Latest platform versions, filled in by the tested-up-to task.
    pub wp_version: Option<String>,
    pub wc_version: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: DeployTarget::WpOrg,
            version: None,
            minify: true,
            owner: None,
            repo: None,
            assume_yes: false,
            dry_run: false,
            built: false,
            watching: false,
            wp_version: None,
            wc_version: None,
        }
    }
}

/// Context handed to every step of a pipeline invocation.
pub struct RunContext {
    pub run_id: RunId,
    pub root: PathBuf,
    pub config: Config,
    opts: RwLock<Options>,
}

impl RunContext {
    pub fn new(config: Config, root: PathBuf, opts: Options) -> Self {
        Self {
            run_id: RunId::new(),
            root,
            config,
            opts: RwLock::new(opts),
        }
    }

    /// Snapshot of the options bag.
    pub async fn opts(&self) -> Options {
        self.opts.read().await.clone()
    }

    /// Mutate the options bag. The write lock is held only for the closure,
    /// so the mutation is fully committed before the next step reads.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Options),
    {
        f(&mut *self.opts.write().await);
    }

    pub fn main_file_path(&self) -> PathBuf {
        self.root.join(self.config.main_file())
    }

    pub fn readme_path(&self) -> PathBuf {
        self.root.join("readme.txt")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.config.build_dir)
    }

    /// Staged plugin tree inside the build directory.
    pub fn stage_dir(&self) -> PathBuf {
        self.build_dir().join(&self.config.slug)
    }

    pub fn zip_path(&self) -> PathBuf {
        self.build_dir().join(format!("{}.zip", self.config.slug))
    }
}
