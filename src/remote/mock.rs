// ABOUTME: In-memory remote backend for tests and dry runs
// ABOUTME: Records every command and serves scripted outputs and a virtual file tree

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use tokio::sync::Mutex;

use super::command::{CommandOutput, CommandSpec};
use super::error::{RemoteError, Result};
use super::Remote;

#[derive(Debug, Default)]
struct MockState {
    commands: Vec<CommandSpec>,
    files: IndexMap<String, Vec<u8>>,
    paths: BTreeSet<String>,
    responses: Vec<(String, CommandOutput)>,
    failures: Vec<String>,
}

/// A test double that records commands and keeps files in memory.
///
/// Responses are matched by substring against the rendered command line; the
/// first registered match wins. Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a file
    pub async fn add_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .await
            .files
            .insert(path.to_string(), contents.into());
    }

    /// Mark a path as present without contents (directories, binaries)
    pub async fn add_path(&self, path: &str) {
        self.state.lock().await.paths.insert(path.to_string());
    }

    /// Serve `output` for commands whose line contains `needle`
    pub async fn respond(&self, needle: &str, output: CommandOutput) {
        self.state
            .lock()
            .await
            .responses
            .push((needle.to_string(), output));
    }

    /// Make commands containing `needle` fail at the transport level
    pub async fn fail_on(&self, needle: &str) {
        self.state.lock().await.failures.push(needle.to_string());
    }

    /// Commands run so far, in order
    pub async fn commands(&self) -> Vec<CommandSpec> {
        self.state.lock().await.commands.clone()
    }

    /// Rendered command lines run so far, in order
    pub async fn command_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .commands
            .iter()
            .map(CommandSpec::command_line)
            .collect()
    }

    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(path).cloned()
    }

    pub async fn file_text(&self, path: &str) -> Option<String> {
        self.file(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
    }
}

#[async_trait]
impl Remote for MockRemote {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let mut state = self.state.lock().await;
        state.commands.push(command.clone());

        let line = command.command_line();
        if state.failures.iter().any(|needle| line.contains(needle.as_str())) {
            return Err(RemoteError::failure("run", line, "connection lost"));
        }

        Ok(state
            .responses
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.state
            .lock()
            .await
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::failure("get", path, "no such file"))
    }

    async fn put(&self, contents: &[u8], path: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.failures.iter().any(|needle| path.contains(needle.as_str())) {
            return Err(RemoteError::failure("put", path, "permission denied"));
        }
        state.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .keys()
            .chain(state.paths.iter())
            .any(|candidate| wildcard_match(path, candidate)))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

/// Match `?` and `*` wildcards; other characters match literally
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p).copied() {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
