// ABOUTME: Error types for namelist decoding, overlay, and document edits
// ABOUTME: Identifies the offending line, group, or key for each failure

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NamelistError {
    #[error("Namelist decode error at line {line}: {message}")]
    DecodeError { line: usize, message: String },

    #[error("Overlay key dropped: '{path}' is not declared in the namelist")]
    OverlayKeyDropped { path: String },

    #[error("Namelist group '{group}' not found")]
    MissingGroup { group: String },

    #[error("Unsupported namelist value for '{key}': {reason}")]
    UnsupportedValue { key: String, reason: String },

    #[error("Invalid overlay specification: {reason}")]
    InvalidOverlay { reason: String },
}

pub type Result<T> = std::result::Result<T, NamelistError>;
