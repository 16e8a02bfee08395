//! Options for the all-table and single-table flows.

use std::path::PathBuf;

/// Directory both artifacts go to and come from unless told otherwise.
pub const DEFAULT_EXPORT_DIR: &str = "./export";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportAllOptions {
    pub export_dir: PathBuf,
    /// Exact table names to skip.
    pub ignore: Vec<String>,
}

impl Default for ExportAllOptions {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            ignore: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAllOptions {
    pub import_dir: PathBuf,
    /// Regex applied to each discovered name; empty leaves names alone.
    pub rename_pattern: String,
    pub rename_replacement: String,
    /// Per-table cap on written items, 0 for none.
    pub row_limit: u64,
}

impl Default for ImportAllOptions {
    fn default() -> Self {
        Self {
            import_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            rename_pattern: String::new(),
            rename_replacement: String::new(),
            row_limit: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSingleOptions {
    pub import_dir: PathBuf,
    pub source_table: String,
    /// Defaults to the source name when absent or empty.
    pub destination_table: Option<String>,
    pub row_limit: u64,
}

impl ImportSingleOptions {
    pub fn new(source_table: impl Into<String>) -> Self {
        Self {
            import_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            source_table: source_table.into(),
            destination_table: None,
            row_limit: 0,
        }
    }

    pub fn destination(&self) -> &str {
        self.destination_table
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.source_table)
    }
}
