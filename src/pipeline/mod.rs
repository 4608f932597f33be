//! The task orchestrator.
//!
//! A [`Registry`] holds named tasks. Each task is either a direct async
//! operation or a composition of other task names, run in order or in
//! parallel. Sequential execution is fail-fast: the first error aborts the
//! rest of the pipeline. Parallel groups join on all members before the
//! surrounding sequence continues.

pub mod registry;
pub mod task;

pub use registry::Registry;
pub use task::{composed, op, parallel, series, StepFn, StepOutcome, TaskBody};
