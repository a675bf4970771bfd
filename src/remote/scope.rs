// ABOUTME: Scoped shell state for remote commands: exported variables, source prefixes, cwd
// ABOUTME: Each scope is undone when its guard drops, on success and on error paths alike

use indexmap::IndexMap;
use std::ops::{Deref, DerefMut};

use super::command::CommandSpec;
use crate::environ::{scalar_to_string, EnvStore, EnvironError, Result};

#[derive(Debug, Clone, Default)]
struct ScopeFrame {
    env: IndexMap<String, String>,
    prefix: Option<String>,
    cwd: Option<String>,
}

/// Stack of active shell scopes.
///
/// Commands built with [`ShellSession::command`] carry every active scope:
/// variables from all frames (inner frames win), prefixes outermost first, and
/// the innermost working directory.
#[derive(Debug, Default)]
pub struct ShellSession {
    frames: Vec<ScopeFrame>,
}

/// Active scope; dropping it restores the session to its prior state
pub struct ScopeGuard<'a> {
    session: &'a mut ShellSession,
    depth: usize,
}

/// Resolve `names` from the store into an environment-variable mapping.
///
/// Every name must resolve to a scalar or a list of scalars.
pub fn scoped_env(store: &EnvStore, names: &[&str]) -> Result<IndexMap<String, String>> {
    let mut env = IndexMap::new();
    for name in names {
        let value = store.lookup(name)?;
        let text = scalar_to_string(value).ok_or_else(|| EnvironError::TypeMismatch {
            path: name.to_string(),
            expected: "a scalar",
            found: crate::environ::store::type_name(value),
        })?;
        env.insert(name.to_string(), text);
    }
    Ok(env)
}

impl ShellSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Export exactly `names`, read from `store`, for commands built inside the scope.
    ///
    /// Nothing is pushed if any name fails to resolve.
    pub fn with_scope(&mut self, store: &EnvStore, names: &[&str]) -> Result<ScopeGuard<'_>> {
        let env = scoped_env(store, names)?;
        Ok(self.with_env(env))
    }

    pub fn with_env(&mut self, env: IndexMap<String, String>) -> ScopeGuard<'_> {
        self.push(ScopeFrame {
            env,
            ..ScopeFrame::default()
        })
    }

    /// Run `line` (e.g. `source envconf`) before each command in the scope
    pub fn with_prefix(&mut self, line: impl Into<String>) -> ScopeGuard<'_> {
        self.push(ScopeFrame {
            prefix: Some(line.into()),
            ..ScopeFrame::default()
        })
    }

    pub fn with_cwd(&mut self, dir: impl Into<String>) -> ScopeGuard<'_> {
        self.push(ScopeFrame {
            cwd: Some(dir.into()),
            ..ScopeFrame::default()
        })
    }

    pub fn env(&self) -> IndexMap<String, String> {
        let mut merged = IndexMap::new();
        for frame in &self.frames {
            for (key, value) in &frame.env {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn prefixes(&self) -> Vec<&str> {
        self.frames
            .iter()
            .filter_map(|frame| frame.prefix.as_deref())
            .collect()
    }

    pub fn cwd(&self) -> Option<&str> {
        self.frames.iter().rev().find_map(|frame| frame.cwd.as_deref())
    }

    /// Build a command carrying the active scopes
    pub fn command(&self, program: impl Into<String>) -> CommandSpec {
        let mut spec = CommandSpec::new(program);
        spec.env = self.env();
        spec.prefixes = self.prefixes().into_iter().map(String::from).collect();
        spec.working_dir = self.cwd().map(String::from);
        spec
    }

    fn push(&mut self, frame: ScopeFrame) -> ScopeGuard<'_> {
        let depth = self.frames.len();
        self.frames.push(frame);
        ScopeGuard {
            session: self,
            depth,
        }
    }
}

impl Deref for ScopeGuard<'_> {
    type Target = ShellSession;

    fn deref(&self) -> &ShellSession {
        self.session
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut ShellSession {
        self.session
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.session.frames.truncate(self.depth);
    }
}
