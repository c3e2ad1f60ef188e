//! Result models and schema constants for datashift.
//!
//! This crate defines the payloads the adapters serialize back to callers and
//! the constants (defaults, keep-alives, catalog queries) shared by the
//! database clients, control planes, and tool servers.

pub mod models;
pub mod schema;

pub use models::*;
