//! srcquery core - error taxonomy and wire-level enums shared by every crate

mod error;
mod types;

pub use error::*;
pub use types::*;
