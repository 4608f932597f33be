//! The deploy pipeline builder and the filesystem steps over a real tree.

use std::sync::{Arc, Mutex};

use shipwright::pipeline::{composed, op, TaskBody};
use shipwright::tasks;
use shipwright::{DeployTarget, Error, Options, Registry, StepOutcome};

use crate::fixtures;

fn recorder(log: Arc<Mutex<Vec<String>>>, name: &str) -> TaskBody {
    let name = name.to_string();
    op(move |_ctx| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.lock().unwrap().push(name);
            Ok(StepOutcome::Continue)
        }
    })
}

/// Registry where every step of the deploy pipeline is a recording stub,
/// with the real pipeline builder on top.
fn stubbed_deploy_registry(opts: &Options, log: Arc<Mutex<Vec<String>>>) -> Registry {
    let mut reg = Registry::new();
    for step in tasks::deploy_steps(opts) {
        reg.register(&step, recorder(log.clone(), &step)).unwrap();
    }
    reg.register("deploy", composed(tasks::deploy_steps)).unwrap();
    reg
}

#[tokio::test]
async fn test_deploy_pipeline_runs_builder_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let opts = Options {
        target: DeployTarget::Copy,
        assume_yes: true,
        ..Options::default()
    };
    let reg = stubbed_deploy_registry(&opts, log.clone());
    let ctx = fixtures::context(dir.path(), opts.clone());

    let outcome = reg.run("deploy", ctx).await.unwrap();
    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(*log.lock().unwrap(), tasks::deploy_steps(&opts));
}

#[tokio::test]
async fn test_deploy_pipeline_skips_build_once_built() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let base = Options {
        target: DeployTarget::Copy,
        assume_yes: true,
        ..Options::default()
    };
    // Register stubs for the full variant so both runs resolve.
    let reg = stubbed_deploy_registry(&base, log.clone());
    let ctx = fixtures::context(dir.path(), base);

    reg.run("deploy", ctx.clone()).await.unwrap();
    assert!(log.lock().unwrap().contains(&"build".to_string()));

    log.lock().unwrap().clear();
    ctx.update(|o| o.built = true).await;
    reg.run("deploy", ctx).await.unwrap();
    assert!(!log.lock().unwrap().contains(&"build".to_string()));
}

#[tokio::test]
async fn test_bump_versions_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::plugin_tree(dir.path());

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    let opts = Options {
        version: Some("1.5.0".to_string()),
        ..Options::default()
    };
    let ctx = fixtures::context(dir.path(), opts);
    reg.run("bump-versions", ctx).await.unwrap();

    let main = std::fs::read_to_string(dir.path().join("woo-order-sync.php")).unwrap();
    assert!(main.contains("Version: 1.5.0"));
    assert!(main.contains("define( 'WOO_ORDER_SYNC_VERSION', '1.5.0' )"));

    let readme = std::fs::read_to_string(dir.path().join("readme.txt")).unwrap();
    assert!(readme.contains("Stable tag: 1.5.0"));

    let package = std::fs::read_to_string(dir.path().join("package.json")).unwrap();
    assert!(package.contains("\"version\": \"1.5.0\""));
}

#[tokio::test]
async fn test_bump_failure_leaves_unmatched_file_intact() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::plugin_tree(dir.path());
    // A readme with no Stable tag line cannot be bumped.
    let readme = "=== Woo Order Sync ===\n\n== Changelog ==\n\n= 1.5.0 =\n* Sync retries.\n";
    fixtures::write(&dir.path().join("readme.txt"), readme);

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    let opts = Options {
        version: Some("1.5.0".to_string()),
        ..Options::default()
    };
    let ctx = fixtures::context(dir.path(), opts);
    let err = reg.run("bump-versions", ctx).await.unwrap_err();

    assert_eq!(err.step_name(), Some("bump-versions"));
    match err {
        Error::Step { source, .. } => {
            assert!(matches!(*source, Error::PatternUnmatched { .. }))
        }
        other => panic!("expected Step error, got {}", other),
    }
    // The file whose pattern failed was never written.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("readme.txt")).unwrap(),
        readme
    );
}

#[tokio::test]
async fn test_stage_through_registry_excludes_dev_paths() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::plugin_tree(dir.path());

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    reg.run("stage", ctx.clone()).await.unwrap();

    let staged = ctx.stage_dir();
    assert!(staged.join("woo-order-sync.php").exists());
    assert!(staged.join("includes/core.php").exists());
    assert!(staged.join("assets/js/admin.js").exists());
    assert!(!staged.join("node_modules").exists());
}

#[tokio::test]
async fn test_release_marker_gate() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::plugin_tree(dir.path());

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    // The changelog documents 1.5.0, so that release passes the gate.
    let ctx = fixtures::context(
        dir.path(),
        Options {
            version: Some("1.5.0".to_string()),
            ..Options::default()
        },
    );
    let outcome = reg.run("check-release-marker", ctx).await.unwrap();
    assert_eq!(outcome, StepOutcome::Continue);

    // 9.9.9 has no changelog entry yet.
    let ctx = fixtures::context(
        dir.path(),
        Options {
            version: Some("9.9.9".to_string()),
            ..Options::default()
        },
    );
    let err = reg.run("check-release-marker", ctx).await.unwrap_err();
    assert_eq!(err.step_name(), Some("check-release-marker"));
}

#[tokio::test]
async fn test_lint_group_with_stubbed_commands() {
    let dir = tempfile::tempdir().unwrap();

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    // The fixture config stubs both lint commands to `true`.
    let ctx = fixtures::context(dir.path(), Options::default());
    let outcome = reg.run("lint", ctx).await.unwrap();
    assert_eq!(outcome, StepOutcome::Continue);
}

#[tokio::test]
async fn test_build_marks_built_for_later_compositions() {
    let dir = tempfile::tempdir().unwrap();

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    reg.run("build", ctx.clone()).await.unwrap();

    let opts = ctx.opts().await;
    assert!(opts.built);
    // A deploy pipeline composed after the build leaves the build step out.
    assert!(!tasks::deploy_steps(&opts).contains(&"build".to_string()));
}
