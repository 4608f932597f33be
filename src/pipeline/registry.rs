//! Task registration and pipeline execution.

use futures::future::{join_all, BoxFuture};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::pipeline::task::{StepOutcome, TaskBody};
use crate::{shlog, shlog_debug};

/// Registry of named tasks.
///
/// Tasks are registered once at startup and looked up by name at run time.
/// Execution is fail-fast: in a series, a step's error aborts the pipeline
/// and the remaining steps are never invoked. A parallel group starts all
/// members together and completes only once every member has completed.
pub struct Registry {
    tasks: HashMap<String, TaskBody>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Register a task under a unique name.
    ///
    /// Registering the same name twice is a deterministic error; an earlier
    /// definition is never silently overwritten.
    pub fn register(&mut self, name: &str, body: TaskBody) -> Result<()> {
        if self.tasks.contains_key(name) {
            return Err(Error::DuplicateTask(name.to_string()));
        }
        self.tasks.insert(name.to_string(), body);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered task names, sorted for display.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Execute a task by name.
    ///
    /// Returns `Ok(StepOutcome::SkipRest)` when a step ended the pipeline
    /// early on purpose; that is a successful completion.
    pub async fn run(&self, name: &str, ctx: Arc<RunContext>) -> Result<StepOutcome> {
        shlog!("run '{}' ({})", name, ctx.run_id.short());
        self.run_task(name.to_string(), ctx, Vec::new()).await
    }

    /// Execute an ad-hoc ordered list of registered tasks, fail-fast.
    pub async fn run_series(&self, names: &[&str], ctx: Arc<RunContext>) -> Result<StepOutcome> {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        self.series_with(&names, ctx, &[]).await
    }

    /// Execute registered tasks concurrently and join on all of them.
    pub async fn run_parallel(&self, names: &[&str], ctx: Arc<RunContext>) -> Result<StepOutcome> {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        self.parallel_with(&names, ctx, &[]).await
    }

    fn run_task(
        &self,
        name: String,
        ctx: Arc<RunContext>,
        stack: Vec<String>,
    ) -> BoxFuture<'_, Result<StepOutcome>> {
        Box::pin(async move {
            if stack.iter().any(|n| n == &name) {
                return Err(Error::TaskCycle(name));
            }
            let body = self
                .tasks
                .get(&name)
                .ok_or_else(|| Error::UnknownTask(name.clone()))?;

            let mut stack = stack;
            stack.push(name.clone());

            match body {
                TaskBody::Op(f) => {
                    shlog_debug!("step '{}' starting", name);
                    match f(ctx).await {
                        Ok(outcome) => {
                            shlog_debug!("step '{}' finished ({:?})", name, outcome);
                            Ok(outcome)
                        }
                        Err(e) => Err(Error::step(&name, e)),
                    }
                }
                TaskBody::Series(names) => self.series_with(names, ctx, &stack).await,
                TaskBody::Parallel(names) => self.parallel_with(names, ctx, &stack).await,
                TaskBody::Composed(build) => {
                    // The step list is fixed here, before execution starts;
                    // option writes made by the steps cannot change it.
                    let steps = build(&ctx.opts().await);
                    shlog_debug!("composed '{}' -> {:?}", name, steps);
                    self.series_with(&steps, ctx, &stack).await
                }
            }
        })
    }

    async fn series_with(
        &self,
        names: &[String],
        ctx: Arc<RunContext>,
        stack: &[String],
    ) -> Result<StepOutcome> {
        for name in names {
            match self
                .run_task(name.clone(), ctx.clone(), stack.to_vec())
                .await?
            {
                StepOutcome::Continue => {}
                StepOutcome::SkipRest => {
                    shlog!("pipeline ended early at '{}'", name);
                    return Ok(StepOutcome::SkipRest);
                }
            }
        }
        Ok(StepOutcome::Continue)
    }

    /// All members start together; the join waits for every one of them
    /// even when some fail. When members fail, the first in member-list
    /// order wins. A member's SkipRest does not end the surrounding
    /// sequence; it is confined to that member.
    async fn parallel_with(
        &self,
        names: &[String],
        ctx: Arc<RunContext>,
        stack: &[String],
    ) -> Result<StepOutcome> {
        let members = names
            .iter()
            .map(|name| self.run_task(name.clone(), ctx.clone(), stack.to_vec()));
        let results = join_all(members).await;
        for result in results {
            result?;
        }
        Ok(StepOutcome::Continue)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
