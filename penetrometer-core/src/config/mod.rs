//! Configuration types
//!
//! Board-agnostic configuration structures. The firmware crate owns parsing.

pub mod types;

pub use types::*;
