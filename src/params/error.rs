// ABOUTME: Error types for derived parameter calculation
// ABOUTME: Reports malformed timestamps, conflicting options, and invalid process counts

use thiserror::Error;

use crate::namelist::NamelistError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("Invalid timestamp '{value}': {reason} (expected YYYYMMDDHH)")]
    DateFormatError { value: String, reason: String },

    #[error("Exactly one of '{first}' or '{second}' must be set: {found}")]
    ExclusiveOptionConflict {
        first: &'static str,
        second: &'static str,
        found: &'static str,
    },

    #[error("Invalid process count {0}: must be at least 1")]
    InvalidProcessCount(i64),

    #[error("Invalid run mode '{0}'. Expected 'cold' or 'warm'")]
    InvalidRunMode(String),

    #[error(transparent)]
    Namelist(#[from] NamelistError),
}

pub type Result<T> = std::result::Result<T, ParamError>;
