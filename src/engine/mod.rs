// ABOUTME: Task execution engine for bosun runs
// ABOUTME: Holds the per-run task context, the namelist pipeline, and task results

pub mod context;
pub mod error;
pub mod pipeline;
pub mod result;

pub use context::TaskContext;
pub use error::{ExecutionError, Result};
pub use pipeline::{NamelistPipeline, PipelineStage, PipelineState};
pub use result::{RunResult, RunStatus, TaskResult, TaskStatus};
