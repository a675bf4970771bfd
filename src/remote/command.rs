// ABOUTME: Structured remote command descriptor and captured command output
// ABOUTME: Renders program, working directory, scoped env, and source prefixes into one shell line

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A command to run on the remote side.
///
/// `program` is emitted verbatim, so it may be a whole shell line
/// (`. run_g4c_model.cray ...`, `for f in ...; done`). Arguments are quoted.
/// An empty `expected_exit_codes` accepts any exit code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    /// Shell lines run before the command in the same shell, e.g. `source envconf`
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default = "default_exit_codes")]
    pub expected_exit_codes: Vec<i32>,
}

fn default_exit_codes() -> Vec<i32> {
    vec![0]
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: IndexMap::new(),
            prefixes: Vec::new(),
            expected_exit_codes: default_exit_codes(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn prefix(mut self, line: impl Into<String>) -> Self {
        self.prefixes.push(line.into());
        self
    }

    pub fn expect_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.expected_exit_codes = codes;
        self
    }

    pub fn allow_any_exit(self) -> Self {
        self.expect_exit_codes(Vec::new())
    }

    pub fn accepts(&self, exit_code: i32) -> bool {
        self.expected_exit_codes.is_empty() || self.expected_exit_codes.contains(&exit_code)
    }

    /// Program and quoted arguments
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }

    /// Full invocation for `bash -c`: `cd dir && export K=v && prefix && command`
    pub fn render_invocation(&self) -> String {
        let mut parts = Vec::new();
        if let Some(dir) = &self.working_dir {
            parts.push(format!("cd {}", shell_quote(dir)));
        }
        for (key, value) in &self.env {
            parts.push(format!("export {}={}", key, shell_quote(value)));
        }
        parts.extend(self.prefixes.iter().cloned());
        parts.push(self.command_line());
        parts.join(" && ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Captured result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code,
        }
    }

    /// Last non-blank stdout line, trimmed
    pub fn last_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
    }

    /// Text following `marker` on the first stdout line that contains it
    pub fn value_after(&self, marker: &str) -> Option<&str> {
        self.stdout.lines().find_map(|line| {
            line.find(marker)
                .map(|at| line[at + marker.len()..].trim())
        })
    }
}

/// Quote a word for a POSIX shell, leaving plain words untouched
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./,:=@%+".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Quote a path but keep `*`, `?` and `[...]` live for the shell to expand
pub fn glob_quote(pattern: &str) -> String {
    let mut out = String::new();
    for c in pattern.chars() {
        if c.is_ascii_alphanumeric() || "_-./,:=@%+*?[]".contains(c) {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
