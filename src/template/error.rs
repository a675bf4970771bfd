// ABOUTME: Error types for template resolution
// ABOUTME: Defines syntax, missing key, non-scalar, and reference cycle failures

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Template syntax error at offset {position} in '{template}': {message}")]
    SyntaxError {
        template: String,
        position: usize,
        message: String,
    },

    #[error("Missing environment key '{path}' in template '{template}'")]
    MissingEnvironmentKey { path: String, template: String },

    #[error("Invalid placeholder '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Placeholder '{path}' does not resolve to a scalar value")]
    NotScalar { path: String },

    #[error("Circular reference while resolving '{path}'")]
    CircularReference { path: String },
}

pub type Result<T> = std::result::Result<T, TemplateError>;
