//! Utilities for running shell commands with proper error handling

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to execute command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Command failed with exit code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Run a shell command and return its stdout
///
/// The child is killed if the returned future is dropped, so wrapping the
/// call in `tokio::time::timeout` bounds the process lifetime as well.
pub async fn run_shell_command(
    command: &str,
    envs: &[(&str, &str)],
) -> Result<String, CommandError> {
    #[cfg(unix)]
    let (shell, flag) = ("sh", "-c");

    #[cfg(windows)]
    let (shell, flag) = ("cmd", "/C");

    let mut cmd = Command::new(shell);
    cmd.arg(flag)
        .arg(command)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running shell command: {}", command);

    let output = cmd.output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("Command failed: {}", command);
        error!("Stderr: {}", stderr);
        return Err(CommandError::Failed {
            code: output.status.code(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
