// ABOUTME: Task and run result types
// ABOUTME: Records status, timing, output, and metadata for each task of a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// Results of the tasks of one run, in execution order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub status: RunStatus,
    pub tasks: Vec<TaskResult>,
}

impl TaskResult {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            output: None,
            error: None,
            metadata: HashMap::new(),
        }
    }

    pub fn mark_started(&mut self) {
        self.status = TaskStatus::Running;
        self.start_time = Utc::now();
    }

    pub fn mark_completed(
        &mut self,
        status: TaskStatus,
        output: Option<String>,
        error: Option<String>,
    ) {
        self.status = status;
        self.end_time = Some(Utc::now());
        self.duration = Some(
            (Utc::now() - self.start_time)
                .to_std()
                .unwrap_or(Duration::ZERO),
        );
        self.output = output;
        self.error = error;
    }

    pub fn succeed(mut self, output: Option<String>) -> Self {
        self.mark_completed(TaskStatus::Success, output, None);
        self
    }

    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.mark_completed(TaskStatus::Skipped, Some(reason.into()), None);
        self
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn is_successful(&self) -> bool {
        matches!(self.status, TaskStatus::Success | TaskStatus::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }
}

impl RunResult {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            status: RunStatus::Running,
            tasks: Vec::new(),
        }
    }

    pub fn add_task_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    pub fn mark_completed(&mut self) {
        self.end_time = Some(Utc::now());
        self.duration = Some(
            (Utc::now() - self.start_time)
                .to_std()
                .unwrap_or(Duration::ZERO),
        );
        self.status = if self.has_failures() {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };
    }

    pub fn get_task_result(&self, task_id: &str) -> Option<&TaskResult> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn has_failures(&self) -> bool {
        self.tasks.iter().any(TaskResult::is_failed)
    }
}
