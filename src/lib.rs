pub mod config;
pub mod context;
pub mod error;
pub mod log;
pub mod pipeline;
pub mod steps;
pub mod tasks;
pub mod util;
pub mod watch;

pub use context::{DeployTarget, Options, RunContext, RunId};
pub use error::{Error, Result};
pub use pipeline::{Registry, StepOutcome};
