// ABOUTME: Environment store module holding the nested run description for one task
// ABOUTME: Provides path addressing, scalar access, and the option builder that composes defaults

pub mod error;
pub mod options;
pub mod store;

pub use error::{EnvironError, Result};
pub use options::{deep_merge, parse_assignment, EnvironBuilder};
pub use store::{scalar_to_string, EnvStore, PathSegment};
