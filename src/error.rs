use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Missing required environment variables: {0}")]
    MissingEnv(String),

    #[error("Working copy has {changes} uncommitted change(s); commit or stash them first")]
    DirtyWorkTree { changes: usize },

    #[error("Required tool not found on PATH: {0}")]
    ToolMissing(String),

    #[error("{file} is missing expected marker: {marker}")]
    MarkerMissing { file: String, marker: String },

    #[error("Command `{command}` exited with code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("No match for pattern `{pattern}` in {}", .file.display())]
    PatternUnmatched { file: PathBuf, pattern: String },

    #[error("{service} API returned {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Task already registered: {0}")]
    DuplicateTask(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task composition cycles back to: {0}")]
    TaskCycle(String),

    #[error("task '{task}' failed: {source}")]
    Step {
        task: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl Error {
    /// Wrap a step error with the name of the failing task.
    pub fn step(task: &str, source: Error) -> Self {
        Error::Step {
            task: task.to_string(),
            source: Box::new(source),
        }
    }

    /// Name of the failing task, when this error came out of a pipeline step.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Error::Step { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
