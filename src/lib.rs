//! Back up DynamoDB tables to local JSON artifacts and restore them.
//!
//! Each table becomes two files in the export directory: `<table>.json`
//! with the table description and `<table>.data.json` with its items in a
//! `{ "data": [...], "total": n }` envelope. Both directions stream, so
//! memory use stays bounded by one scan page on export and one item on
//! import.

pub mod client;
pub mod config;
pub mod conversions;
pub mod discovery;
pub mod errors;
pub mod export;
pub mod import;
pub mod orchestrate;
pub mod progress;
pub mod schema;
pub mod store;
pub mod table_operations;

pub use client::ClientConfig;
pub use errors::{DumpError, Result};
pub use schema::SchemaSnapshot;
pub use store::{DynamoStore, MemoryStore, TableStore};
