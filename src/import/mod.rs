//! Streaming table import.
//!
//! - `reader` - incremental envelope parser behind a pull-based [`ItemSource`]
//! - `limit` - row cap decorator
//! - `table` - schema read, provisioning and replay of one table

mod limit;
mod reader;
mod table;

pub use limit::Limited;
pub use reader::{ItemSource, ItemStream};
pub use table::{ImportJob, ImportOutcome, ImportSummary, import_data, import_table};
