// ABOUTME: Namelist module converting Fortran namelist text to and from structured documents
// ABOUTME: Exports the document model, codec, and the overlay merge engine

pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod lexer;
pub mod overlay;
pub mod value;

pub use decode::{decode, decode_bytes};
pub use document::{Document, Group};
pub use encode::{encode, format_scalar, format_value};
pub use error::{NamelistError, Result};
pub use overlay::{apply, apply_in_place, apply_with_mode, overlay_from_value, OverlayMode, OverlaySpec};
pub use value::{NmlValue, Scalar, ScalarKind};
