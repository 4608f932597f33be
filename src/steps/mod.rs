//! Step implementations wired into the task registry.
//!
//! Each function here is one named pipeline step: it takes the shared
//! [`crate::context::RunContext`] and returns a
//! [`crate::pipeline::StepOutcome`]. The orchestration itself lives in
//! [`crate::pipeline`]; these modules only talk to the outside world.

pub mod build;
pub mod package;
pub mod preconditions;
pub mod remote;
pub mod rewrite;
pub mod shell;
