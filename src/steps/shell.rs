//! External command execution.
//!
//! Commands run to completion with captured output; a non-zero exit code is
//! an error naming the command and the code. There is no timeout: a deploy
//! is interactively supervised and a hung tool is the operator's call.

use std::ffi::OsStr;
use std::path::Path;

use tokio::process::Command;

use crate::{shlog_debug, shlog_error, Error, Result};

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a program with arguments in the given directory.
pub async fn run<S: AsRef<OsStr>>(program: &str, args: &[S], cwd: &Path) -> Result<CommandOutput> {
    let rendered = render(program, args);
    shlog_debug!("exec: {} (cwd={})", rendered, cwd.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        shlog_error!("exec failed ({}): {}", code, stderr.trim());
        return Err(Error::CommandFailed {
            command: rendered,
            code,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Run a configured command line through the shell.
pub async fn sh(line: &str, cwd: &Path) -> Result<CommandOutput> {
    run("sh", &["-c", line], cwd).await
}

fn render<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.as_ref().to_string_lossy());
    }
    rendered
}
