// ABOUTME: Per-run task context carrying the environment store between tasks
// ABOUTME: Tasks read parameters from it, render templates against it, and write results back

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::error::Result;
use crate::environ::EnvStore;
use crate::namelist::OverlayMode;
use crate::template;

/// State shared by the tasks of one run.
///
/// Tasks run sequentially and are the only writers of `store`; values a task
/// writes back (`JobID_model`, `run_drifters_pos`) are visible to later tasks.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub store: EnvStore,
    pub overlay_mode: OverlayMode,
}

impl TaskContext {
    pub fn new(store: EnvStore) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            store,
            overlay_mode: OverlayMode::default(),
        }
    }

    pub fn with_overlay_mode(mut self, mode: OverlayMode) -> Self {
        self.overlay_mode = mode;
        self
    }

    /// Render a `{path}` template against the current store
    pub fn render(&self, text: &str) -> Result<String> {
        Ok(template::render(text, &self.store)?)
    }

    /// Write a value back for later tasks
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        debug!("[{}] {} = {}", self.run_id, key, value);
        self.store.set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionError;
    use serde_json::json;

    #[test]
    fn test_render_and_write_back() {
        let store = EnvStore::from_value(json!({"workdir": "/scratch/run1"})).unwrap();
        let mut ctx = TaskContext::new(store);

        assert_eq!(ctx.render("{workdir}/input.nml").unwrap(), "/scratch/run1/input.nml");
        assert!(matches!(
            ctx.render("{expdir}/runscripts"),
            Err(ExecutionError::Template(_))
        ));

        ctx.set("JobID_model", "1234.sdb");
        assert_eq!(ctx.render("{JobID_model}").unwrap(), "1234.sdb");
        assert_eq!(ctx.overlay_mode, OverlayMode::Lenient);
    }
}
