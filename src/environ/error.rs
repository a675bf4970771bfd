// ABOUTME: Error types for environment store operations
// ABOUTME: Covers missing keys, malformed paths, type mismatches, and option loading failures

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvironError {
    #[error("Missing environment key: {path}")]
    MissingEnvironmentKey { path: String },

    #[error("Invalid environment path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Environment key '{path}' is {found}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Environment root must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    #[error("Invalid option override '{0}'. Expected 'key=value'")]
    InvalidOverride(String),

    #[error("Failed to resolve environment references: {0}")]
    Reference(#[from] crate::template::TemplateError),

    #[error("Failed to read environment file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse environment YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, EnvironError>;
