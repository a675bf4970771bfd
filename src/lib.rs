// ABOUTME: Main library module for the bosun ocean-model run preparation toolkit
// ABOUTME: Exports configuration resolution, namelist handling, remote seams, and tasks

pub mod cli;
pub mod engine;
pub mod environ;
pub mod namelist;
pub mod params;
pub mod remote;
pub mod tasks;
pub mod template;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{TaskContext, TaskResult, TaskStatus};
pub use environ::{EnvStore, EnvironBuilder};
pub use namelist::{decode, encode, Document, NmlValue, OverlayMode};
pub use remote::{CommandSpec, Remote, ShellSession};
pub use tasks::TaskRegistry;

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
