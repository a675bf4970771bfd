// ABOUTME: Error types for the remote execution seam
// ABOUTME: Failures are surfaced unchanged to the task that issued the operation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote {operation} failed for '{target}': {message}")]
    RemoteOperationFailure {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("Command failed with exit code {exit_code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

impl RemoteError {
    pub fn failure(operation: &'static str, target: impl Into<String>, message: impl ToString) -> Self {
        RemoteError::RemoteOperationFailure {
            operation,
            target: target.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;
