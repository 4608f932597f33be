//! Pipeline semantics end to end: fail-fast sequencing, parallel joins,
//! soft skips and precondition gating.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shipwright::pipeline::{op, parallel, series, TaskBody};
use shipwright::steps::shell;
use shipwright::tasks;
use shipwright::{DeployTarget, Error, Options, Registry, StepOutcome};

use crate::fixtures;

fn recorder(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> TaskBody {
    op(move |_ctx| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name);
            Ok(StepOutcome::Continue)
        }
    })
}

#[tokio::test]
async fn test_failing_shell_step_aborts_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut reg = Registry::new();
    reg.register("compile", recorder(log.clone(), "compile"))
        .unwrap();
    reg.register(
        "unit-tests",
        op(|ctx| async move {
            shell::sh("exit 1", &ctx.root).await?;
            Ok(StepOutcome::Continue)
        }),
    )
    .unwrap();
    reg.register("publish", recorder(log.clone(), "publish"))
        .unwrap();
    reg.register("release", series(["compile", "unit-tests", "publish"]))
        .unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    let err = reg.run("release", ctx).await.unwrap_err();

    assert_eq!(err.step_name(), Some("unit-tests"));
    match err {
        Error::Step { source, .. } => {
            assert!(matches!(*source, Error::CommandFailed { code: 1, .. }))
        }
        other => panic!("expected Step error, got {}", other),
    }
    // The step before ran once; the step after never ran.
    assert_eq!(*log.lock().unwrap(), vec!["compile"]);
}

#[tokio::test]
async fn test_parallel_group_completes_after_all_members() {
    let dir = tempfile::tempdir().unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    let mut reg = Registry::new();
    for (name, delay) in [("lint-a", 60u64), ("lint-b", 5u64)] {
        let done = done.clone();
        reg.register(
            name,
            op(move |_ctx| {
                let done = done.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(StepOutcome::Continue)
                }
            }),
        )
        .unwrap();
    }
    reg.register("lint", parallel(["lint-a", "lint-b"])).unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    let outcome = reg.run("lint", ctx).await.unwrap();

    assert_eq!(outcome, StepOutcome::Continue);
    assert_eq!(done.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_soft_skip_ends_pipeline_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut reg = Registry::new();
    reg.register("prepare", recorder(log.clone(), "prepare"))
        .unwrap();
    reg.register("opt-out", op(|_ctx| async { Ok(StepOutcome::SkipRest) }))
        .unwrap();
    reg.register("ship", recorder(log.clone(), "ship")).unwrap();
    reg.register("release", series(["prepare", "opt-out", "ship"]))
        .unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    let outcome = reg.run("release", ctx).await.unwrap();

    assert_eq!(outcome, StepOutcome::SkipRest);
    assert_eq!(*log.lock().unwrap(), vec!["prepare"]);
}

#[tokio::test]
async fn test_series_with_unknown_member_fails() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut reg = Registry::new();
    reg.register("known", recorder(log.clone(), "known")).unwrap();
    reg.register("flow", series(["known", "missing"])).unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    let err = reg.run("flow", ctx).await.unwrap_err();
    assert!(matches!(err, Error::UnknownTask(name) if name == "missing"));
}

#[tokio::test]
async fn test_missing_env_blocks_every_deploy_side_effect() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::plugin_tree(dir.path());
    fixtures::init_git_repo(dir.path());

    // The only test that touches this variable.
    std::env::remove_var("GITHUB_TOKEN");

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    let opts = Options {
        target: DeployTarget::GitHub,
        assume_yes: true,
        ..Options::default()
    };
    let ctx = fixtures::context(dir.path(), opts);
    let err = reg.run("deploy", ctx.clone()).await.unwrap_err();

    assert_eq!(err.step_name(), Some("check-env"));
    match err {
        Error::Step { source, .. } => match *source {
            Error::MissingEnv(vars) => assert!(vars.contains("GITHUB_TOKEN")),
            other => panic!("expected MissingEnv, got {}", other),
        },
        other => panic!("expected Step error, got {}", other),
    }

    // Nothing after the failed precondition ran: no build artifacts, no
    // rewrites.
    assert!(!ctx.build_dir().exists());
    let main = std::fs::read_to_string(dir.path().join("woo-order-sync.php")).unwrap();
    assert!(main.contains("Version: 1.4.2"));
}

#[tokio::test]
async fn test_worktree_check_clean_then_dirty() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::plugin_tree(dir.path());
    fixtures::init_git_repo(dir.path());

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    let outcome = reg.run("check-worktree", ctx.clone()).await.unwrap();
    assert_eq!(outcome, StepOutcome::Continue);

    // Modify a tracked file; the check now refuses to proceed.
    fixtures::write(
        &dir.path().join("includes/core.php"),
        "<?php // edited, not committed\n",
    );
    let err = reg.run("check-worktree", ctx).await.unwrap_err();
    assert_eq!(err.step_name(), Some("check-worktree"));
    match err {
        Error::Step { source, .. } => {
            assert!(matches!(*source, Error::DirtyWorkTree { changes } if changes > 0))
        }
        other => panic!("expected Step error, got {}", other),
    }
}

#[tokio::test]
async fn test_untracked_files_do_not_dirty_the_worktree() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::plugin_tree(dir.path());
    fixtures::init_git_repo(dir.path());

    fixtures::write(&dir.path().join("scratch.txt"), "notes\n");

    let mut reg = Registry::new();
    tasks::register_all(&mut reg).unwrap();

    let ctx = fixtures::context(dir.path(), Options::default());
    let outcome = reg.run("check-worktree", ctx).await.unwrap();
    assert_eq!(outcome, StepOutcome::Continue);
}
