//! Watch mode: rebuild assets whenever a source path changes.
//!
//! Events arrive from notify on a crossbeam channel and are debounced so a
//! save burst triggers one rebuild, not ten. A failed rebuild is reported
//! and the watcher keeps running; watch mode never deploys.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;

use crate::context::RunContext;
use crate::pipeline::Registry;
use crate::{shlog, shlog_error, shlog_warn, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const DEBOUNCE: Duration = Duration::from_millis(300);

/// Watch the configured source paths and re-run the build task on change.
/// Returns when the cancellation token fires (Ctrl-C in the CLI).
pub async fn watch(reg: &Registry, ctx: Arc<RunContext>, cancel: CancellationToken) -> Result<()> {
    ctx.update(|o| o.watching = true).await;

    let (tx, rx) = unbounded();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let _ = tx.send(event);
    })?;

    let mut watched = 0;
    for rel in &ctx.config.watch_paths {
        let path = ctx.root.join(rel);
        if path.exists() {
            watcher.watch(&path, RecursiveMode::Recursive)?;
            watched += 1;
        } else {
            shlog_warn!("watch path does not exist, skipping: {}", path.display());
        }
    }
    shlog!("watching {} path(s)", watched);
    println!("Watching for changes (Ctrl-C to stop)...");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        if !drain_mutations(&rx) {
            continue;
        }

        // Let the save burst settle, then collapse whatever queued up.
        tokio::time::sleep(DEBOUNCE).await;
        drain_mutations(&rx);

        println!("Change detected, rebuilding...");
        match reg.run("build", ctx.clone()).await {
            Ok(_) => println!("Rebuild done."),
            Err(e) => {
                // Watch mode stays alive through build failures.
                shlog_error!("rebuild failed: {}", e);
                eprintln!("rebuild failed: {}", e);
            }
        }
    }

    shlog!("watch stopped");
    Ok(())
}

/// Drain queued events; true when any of them was a real mutation.
fn drain_mutations(rx: &Receiver<notify::Result<Event>>) -> bool {
    let mut changed = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            Ok(event) if is_mutation(&event) => changed = true,
            Ok(_) => {}
            Err(e) => shlog_warn!("watch event error: {}", e),
        }
    }
    changed
}

fn is_mutation(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
