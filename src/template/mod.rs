// ABOUTME: Template resolver module for environment-driven string rendering
// ABOUTME: Provides placeholder parsing, rendering, and reference resolution over the environment store

pub mod engine;
pub mod error;

pub use engine::{
    has_placeholders, placeholders, render, render_value, render_with, resolve_references,
    Segment,
};
pub use error::{Result, TemplateError};
