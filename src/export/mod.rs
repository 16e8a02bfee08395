//! Table export.
//!
//! - `scanner` - paginated full-table scan
//! - `writer` - schema file and streaming data envelope
//! - `table` - one table end to end

mod scanner;
mod table;
mod writer;

pub use scanner::{Page, Scanner};
pub use table::{ExportSummary, export_table};
pub use writer::{EnvelopeWriter, data_path, schema_path, write_schema};
