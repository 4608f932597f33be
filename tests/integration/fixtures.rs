//! Shared fixtures: a realistic plugin tree and run contexts over it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use git2::{IndexAddOption, Repository, Signature};
use shipwright::config::Config;
use shipwright::{Options, RunContext};

pub const MAIN_PHP: &str = r#"<?php
/**
 * Plugin Name: Woo Order Sync
 * Description: Keeps WooCommerce orders in sync.
 * Version: 1.4.2
 */

define( 'WOO_ORDER_SYNC_VERSION', '1.4.2' );
"#;

pub const README: &str = "=== Woo Order Sync ===\n\
Stable tag: 1.4.2\n\
Tested up to: 6.5\n\
WC tested up to: 8.9\n\
\n\
== Changelog ==\n\
\n\
= 1.5.0 =\n\
* Sync retries.\n\
\n\
= 1.4.2 =\n\
* Fixes.\n";

pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Lay out a plugin project under `root`.
pub fn plugin_tree(root: &Path) {
    write(&root.join("woo-order-sync.php"), MAIN_PHP);
    write(&root.join("readme.txt"), README);
    write(
        &root.join("package.json"),
        "{\n  \"name\": \"woo-order-sync\",\n  \"version\": \"1.4.2\"\n}\n",
    );
    write(&root.join("includes/core.php"), "<?php // core\n");
    write(&root.join("assets/js/admin.js"), "console.log('admin');\n");
    write(&root.join("node_modules/pkg/index.js"), "module.exports = 1;\n");
}

/// A context over `root` with every external command stubbed to succeed.
pub fn context(root: &Path, opts: Options) -> Arc<RunContext> {
    let config: Config = toml::from_str(
        r#"
slug = "woo-order-sync"

[commands]
build = "true"
minify = "true"
lint_scripts = "true"
lint_styles = "true"
"#,
    )
    .unwrap();
    Arc::new(RunContext::new(config, root.to_path_buf(), opts))
}

/// Initialize a git repository at `root` and commit everything in it.
pub fn init_git_repo(root: &Path) -> Repository {
    let repo = Repository::init(root).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Fixture").unwrap();
        config.set_str("user.email", "fixture@example.com").unwrap();
    }
    commit_all(&repo, "Initial import");
    repo
}

/// Stage and commit the whole working tree.
pub fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Fixture", "fixture@example.com").unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}
