// ABOUTME: Remote execution seam: run commands, fetch, push, and test for files on the target host
// ABOUTME: Provides the Remote trait, command descriptors, shell scoping, and local/ssh/mock backends

pub mod command;
pub mod error;
pub mod local;
pub mod mock;
pub mod scope;
pub mod ssh;

use async_trait::async_trait;
use tracing::debug;

pub use command::{glob_quote, is_glob, shell_quote, CommandOutput, CommandSpec};
pub use error::{RemoteError, Result};
pub use local::LocalRemote;
pub use mock::MockRemote;
pub use scope::{scoped_env, ScopeGuard, ShellSession};
pub use ssh::SshRemote;

/// Operations a task may perform on the host where the model runs.
///
/// Implementations report failures as [`RemoteError`] and never retry.
/// `exists` accepts shell glob patterns and is true when anything matches.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Run a command and capture its output, whatever its exit code
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;

    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    async fn put(&self, contents: &[u8], path: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Short target description for logs
    fn describe(&self) -> String;

    /// Run a command and fail unless its exit code is expected
    async fn run_checked(&self, command: &CommandSpec) -> Result<CommandOutput> {
        debug!("[{}] {}", self.describe(), command.render_invocation());
        let output = self.run(command).await?;
        if command.accepts(output.exit_code) {
            Ok(output)
        } else {
            Err(RemoteError::CommandFailed {
                command: command.command_line(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }

    async fn put_text(&self, text: &str, path: &str) -> Result<()> {
        self.put(text.as_bytes(), path).await
    }
}
