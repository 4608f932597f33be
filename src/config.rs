//! Project configuration loaded from `shipwright.toml`.
//!
//! The file lives at the plugin root and describes everything static about
//! the project: the plugin slug, where builds go, which shell commands lint
//! and compile assets, and the remote endpoints a deploy talks to. Runtime
//! state (flags, the release version, fetched platform versions) lives in
//! [`crate::context::Options`], not here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{shlog_debug, Error, Result};

pub const CONFIG_FILE: &str = "shipwright.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Plugin slug, e.g. "woo-order-sync". Names the main file, the staged
    /// build directory and the zip artifact.
    #[serde(default)]
    pub slug: String,
    /// Main plugin file relative to the project root. Defaults to `<slug>.php`.
    pub main_file: Option<String>,
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    #[serde(default)]
    pub commands: Commands,
    pub github: Option<GithubConfig>,
    pub svn: Option<SvnConfig>,
    pub trello: Option<TrelloConfig>,
    /// Sibling repository directory for `copy` deploys.
    pub copy_dir: Option<String>,
    #[serde(default = "default_watch_paths")]
    pub watch_paths: Vec<String>,
    /// Paths excluded from the staged build, matched against the first
    /// component of each path relative to the project root.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commands {
    #[serde(default = "default_build_command")]
    pub build: String,
    #[serde(default = "default_minify_command")]
    pub minify: String,
    #[serde(default = "default_lint_scripts_command")]
    pub lint_scripts: String,
    #[serde(default = "default_lint_styles_command")]
    pub lint_styles: String,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            build: default_build_command(),
            minify: default_minify_command(),
            lint_scripts: default_lint_scripts_command(),
            lint_styles: default_lint_styles_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvnConfig {
    /// Repository URL on plugins.svn.wordpress.org.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrelloConfig {
    /// Card that tracks the release.
    pub card_id: String,
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_watch_paths() -> Vec<String> {
    vec!["assets".to_string(), "includes".to_string()]
}

fn default_exclude() -> Vec<String> {
    [
        ".git",
        ".github",
        "build",
        "node_modules",
        "tests",
        CONFIG_FILE,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_build_command() -> String {
    "npm run build".to_string()
}

fn default_minify_command() -> String {
    "npm run minify".to_string()
}

fn default_lint_scripts_command() -> String {
    "npm run lint:js".to_string()
}

fn default_lint_styles_command() -> String {
    "npm run lint:css".to_string()
}

impl Config {
    /// Load `shipwright.toml` from the project root.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        shlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            return Err(Error::Validation(format!(
                "{} not found in {}",
                CONFIG_FILE,
                root.display()
            )));
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        if config.slug.is_empty() {
            return Err(Error::Validation(format!(
                "{}: `slug` must be set",
                CONFIG_FILE
            )));
        }
        shlog_debug!(
            "Config loaded: slug={} build_dir={} github={} svn={} trello={}",
            config.slug,
            config.build_dir,
            config.github.is_some(),
            config.svn.is_some(),
            config.trello.is_some(),
        );
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = root.join(CONFIG_FILE);
        fs::write(&path, toml::to_string_pretty(self)?)?;
        shlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Main plugin file name, `<slug>.php` unless overridden.
    pub fn main_file(&self) -> String {
        self.main_file
            .clone()
            .unwrap_or_else(|| format!("{}.php", self.slug))
    }

    /// PHP version constant conventionally defined by the plugin,
    /// e.g. `WOO_ORDER_SYNC_VERSION` for slug `woo-order-sync`.
    pub fn version_constant(&self) -> String {
        let upper: String = self
            .slug
            .chars()
            .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        format!("{}_VERSION", upper)
    }
}
