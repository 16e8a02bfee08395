//! Table management operations for imports.
//!
//! This module provides the destination table lifecycle:
//! - `create` - Build a create-table request from a schema snapshot
//! - `provision` - Delete any existing destination and recreate it

mod create;
mod provision;

// Re-export public functions
pub use create::{PreparedCreateTable, prepare_create_table};
pub use provision::{Provisioned, ensure_fresh_table};
