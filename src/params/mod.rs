// ABOUTME: Derived parameter calculators for ocean-model runs
// ABOUTME: Computes decomposition layouts, start dates, and the exclusive run length

pub mod date;
pub mod error;
pub mod layout;
pub mod run_length;

pub use date::{start_date, RunMode, StartDate};
pub use error::{ParamError, Result};
pub use layout::{layout, Layout};
pub use run_length::{run_length, RunLength};
