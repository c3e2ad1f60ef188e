//! MCP tool modules, one per adapter.

pub mod search;
pub mod sql;
