// ABOUTME: Remote backend that runs everything on the local machine
// ABOUTME: Commands go through bash; files are read and written directly

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::command::{glob_quote, is_glob, CommandOutput, CommandSpec};
use super::error::{RemoteError, Result};
use super::Remote;

#[derive(Debug, Clone)]
pub struct LocalRemote {
    shell: String,
}

impl LocalRemote {
    pub fn new() -> Self {
        Self {
            shell: "/bin/bash".to_string(),
        }
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    async fn shell(&self, line: &str) -> Result<CommandOutput> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(line)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RemoteError::failure("run", line, e))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

impl Default for LocalRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Remote for LocalRemote {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.shell(&command.render_invocation()).await
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| RemoteError::failure("get", path, e))
    }

    async fn put(&self, contents: &[u8], path: &str) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| RemoteError::failure("put", path, e))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        if is_glob(path) {
            let check = format!("ls -d {} >/dev/null 2>&1", glob_quote(path));
            return Ok(self.shell(&check).await?.exit_code == 0);
        }
        Ok(tokio::fs::metadata(Path::new(path)).await.is_ok())
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.nml");
        let path = path.to_str().unwrap();
        let remote = LocalRemote::new();

        assert!(!remote.exists(path).await.unwrap());
        remote.put_text("&a\n/\n", path).await.unwrap();
        assert!(remote.exists(path).await.unwrap());
        assert_eq!(remote.get(path).await.unwrap(), b"&a\n/\n");
    }

    #[tokio::test]
    async fn test_get_missing_file() {
        let remote = LocalRemote::new();
        let err = remote.get("/nonexistent/bosun/input.nml").await.unwrap_err();
        assert!(matches!(
            err,
            RemoteError::RemoteOperationFailure { operation: "get", .. }
        ));
    }

    #[tokio::test]
    async fn test_run_with_scope_and_exit_codes() {
        let dir = TempDir::new().unwrap();
        let remote = LocalRemote::new();
        let spec = CommandSpec::new("echo \"$GREETING from $(pwd)\"")
            .cwd(dir.path().to_str().unwrap())
            .env("GREETING", "hello world");

        let output = remote.run_checked(&spec).await.unwrap();
        assert!(output.stdout.starts_with("hello world from "));

        let failing = CommandSpec::new("exit 41");
        assert!(matches!(
            remote.run_checked(&failing).await,
            Err(RemoteError::CommandFailed { exit_code: 41, .. })
        ));
        let tolerated = failing.expect_exit_codes(vec![41]);
        assert_eq!(remote.run_checked(&tolerated).await.unwrap().exit_code, 41);
    }

    #[tokio::test]
    async fn test_glob_exists() {
        let dir = TempDir::new().unwrap();
        let remote = LocalRemote::new();
        let base = dir.path().to_str().unwrap();
        let pattern = format!("{}/ocean_grid?.nc", base);

        assert!(!remote.exists(&pattern).await.unwrap());
        std::fs::write(dir.path().join("ocean_grid1.nc"), b"").unwrap();
        assert!(remote.exists(&pattern).await.unwrap());
    }
}
