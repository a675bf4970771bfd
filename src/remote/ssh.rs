// ABOUTME: Remote backend driving a cluster login node over the system ssh client
// ABOUTME: Commands run under a login bash; files move through cat on the far side

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::command::{glob_quote, shell_quote, CommandOutput, CommandSpec};
use super::error::{RemoteError, Result};
use super::Remote;

#[derive(Debug, Clone)]
pub struct SshRemote {
    host: String,
    ssh: String,
}

impl SshRemote {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ssh: "ssh".to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Wrap a shell line so the far side runs it under `bash -l -c`
    pub fn remote_line(line: &str) -> String {
        format!("bash -l -c {}", shell_quote(line))
    }

    fn command(&self, line: &str) -> Command {
        let mut cmd = Command::new(&self.ssh);
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg(&self.host)
            .arg(Self::remote_line(line))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    async fn shell(&self, operation: &'static str, line: &str) -> Result<CommandOutput> {
        debug!("ssh {} {}", self.host, line);
        let output = self
            .command(line)
            .output()
            .await
            .map_err(|e| RemoteError::failure(operation, &self.host, e))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[async_trait]
impl Remote for SshRemote {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.shell("run", &command.render_invocation()).await
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let output = self
            .command(&format!("cat -- {}", shell_quote(path)))
            .output()
            .await
            .map_err(|e| RemoteError::failure("get", path, e))?;

        if !output.status.success() {
            return Err(RemoteError::failure(
                "get",
                path,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(output.stdout)
    }

    async fn put(&self, contents: &[u8], path: &str) -> Result<()> {
        let mut child = self
            .command(&format!("cat > {}", shell_quote(path)))
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| RemoteError::failure("put", path, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(contents)
                .await
                .map_err(|e| RemoteError::failure("put", path, e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RemoteError::failure("put", path, e))?;
        if !output.status.success() {
            return Err(RemoteError::failure(
                "put",
                path,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let check = format!("ls -d {} >/dev/null 2>&1", glob_quote(path));
        Ok(self.shell("exists", &check).await?.exit_code == 0)
    }

    fn describe(&self) -> String {
        format!("ssh://{}", self.host)
    }
}
