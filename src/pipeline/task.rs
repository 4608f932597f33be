//! Task bodies and step signatures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Options, RunContext};
use crate::error::Result;

/// Outcome of a successfully completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The pipeline continues with the next step.
    Continue,
    /// End the enclosing pipeline early, as a success. Used when an
    /// interactive step opts out of the rest of the run; nothing after the
    /// step executes and no error is reported.
    SkipRest,
}

pub type StepFuture = Pin<Box<dyn Future<Output = Result<StepOutcome>> + Send>>;

/// A direct operation: an async function over the shared run context.
pub type StepFn = Arc<dyn Fn(Arc<RunContext>) -> StepFuture + Send + Sync>;

/// A pipeline builder: reads the options bag at invocation time and returns
/// the ordered list of step names to run. The list is fixed before
/// execution starts and never changes mid-pipeline.
pub type ComposeFn = Arc<dyn Fn(&Options) -> Vec<String> + Send + Sync>;

/// The body of a registered task.
pub enum TaskBody {
    /// A single side-effecting operation.
    Op(StepFn),
    /// An ordered list of task names; each must succeed before the next runs.
    Series(Vec<String>),
    /// Task names started together; the group joins on all of them.
    Parallel(Vec<String>),
    /// A series whose step list is built from the options bag when invoked.
    Composed(ComposeFn),
}

impl std::fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskBody::Op(_) => write!(f, "Op"),
            TaskBody::Series(names) => write!(f, "Series({:?})", names),
            TaskBody::Parallel(names) => write!(f, "Parallel({:?})", names),
            TaskBody::Composed(_) => write!(f, "Composed"),
        }
    }
}

/// Wrap an async function as an [`TaskBody::Op`].
pub fn op<F, Fut>(f: F) -> TaskBody
where
    F: Fn(Arc<RunContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepOutcome>> + Send + 'static,
{
    TaskBody::Op(Arc::new(move |ctx| {
        let fut: StepFuture = Box::pin(f(ctx));
        fut
    }))
}

/// Ordered composition of task names.
pub fn series<I, S>(names: I) -> TaskBody
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TaskBody::Series(names.into_iter().map(Into::into).collect())
}

/// Concurrent composition of task names.
pub fn parallel<I, S>(names: I) -> TaskBody
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TaskBody::Parallel(names.into_iter().map(Into::into).collect())
}

/// A pipeline builder evaluated against the options bag at invocation time.
pub fn composed<F>(f: F) -> TaskBody
where
    F: Fn(&Options) -> Vec<String> + Send + Sync + 'static,
{
    TaskBody::Composed(Arc::new(f))
}
