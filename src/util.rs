//! Shared utility functions.

use tokio::task::spawn_blocking;

use crate::{Error, Result};

/// Run blocking work (git status scans, file tree copies, stdin reads) off
/// the async executor.
pub async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))?
}

/// Read one trimmed line from stdin.
pub async fn prompt_line() -> Result<String> {
    blocking(|| {
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    })
    .await
}
