// ABOUTME: Error types for task execution
// ABOUTME: Aggregates module errors and identifies the failing pipeline stage or command

use thiserror::Error;

use super::pipeline::PipelineStage;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Task not found: {name}")]
    TaskNotFound { name: String },

    #[error("Command exited with unexpected code {exit_code}: {command}")]
    UnexpectedExit { command: String, exit_code: i32 },

    #[error("Output of '{command}' has no '{marker}' line")]
    MissingOutput { command: String, marker: String },

    #[error("Namelist pipeline is {found}, expected {expected}")]
    InvalidStage {
        expected: PipelineStage,
        found: PipelineStage,
    },

    #[error("Namelist pipeline failed during {stage}: {source}")]
    PipelineFailed {
        stage: PipelineStage,
        source: Box<ExecutionError>,
    },

    #[error(transparent)]
    Environ(#[from] crate::environ::EnvironError),

    #[error("Template error: {0}")]
    Template(#[from] crate::template::TemplateError),

    #[error(transparent)]
    Namelist(#[from] crate::namelist::NamelistError),

    #[error(transparent)]
    Param(#[from] crate::params::ParamError),

    #[error(transparent)]
    Remote(#[from] crate::remote::RemoteError),
}

impl ExecutionError {
    /// Stage a pipeline failure happened in, if any
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        match self {
            ExecutionError::PipelineFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
