//! Progress reporting for export and import runs.

use std::io::Write;

use crate::errors::DumpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Export,
    Import,
}

impl Phase {
    fn verb(&self) -> &'static str {
        match self {
            Phase::Export => "Exported",
            Phase::Import => "Imported",
        }
    }
}

/// Observer of a running backup or restore. Every method defaults to doing nothing.
pub trait Progress: Send + Sync {
    fn table_started(&self, _phase: Phase, _table: &str) {}

    /// Called after each item is exported or its write attempted, with the running count.
    fn item_processed(&self, _table: &str, _count: u64) {}

    fn item_failed(&self, _table: &str, _error: &DumpError) {}

    fn table_finished(&self, _phase: Phase, _table: &str, _count: u64) {}
}

/// Progress sink that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl Progress for NoopProgress {}

/// Prints a dot per imported item and a summary line per table on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn item_processed(&self, _table: &str, _count: u64) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(b".");
        let _ = out.flush();
    }

    fn table_finished(&self, phase: Phase, table: &str, count: u64) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "\n{} {} ({} items)", phase.verb(), table, count);
    }
}
