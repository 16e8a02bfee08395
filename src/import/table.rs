//! Import of one table from its export artifacts.

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::errors::{DumpError, Result};
use crate::export::{data_path, schema_path};
use crate::import::limit::Limited;
use crate::import::reader::{ItemSource, ItemStream};
use crate::progress::{Phase, Progress};
use crate::schema::SchemaSnapshot;
use crate::store::{Item, TableStore};
use crate::table_operations::ensure_fresh_table;

/// One import run: which artifacts to read and where to write them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    /// Directory holding `<source_table>.json` and `<source_table>.data.json`.
    pub source_dir: PathBuf,
    pub source_table: String,
    pub destination_table: String,
    /// Maximum items to write; 0 imports everything.
    pub row_limit: u64,
}

/// Why an import stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    LimitReached,
    SourceExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub table: String,
    /// Write attempts, one per item read from the artifact.
    pub attempted: u64,
    pub written: u64,
    pub failed: u64,
    pub outcome: ImportOutcome,
}

/// Puts items one at a time, absorbing per-item failures.
struct TolerantWriter<'a, S: TableStore + ?Sized> {
    store: &'a S,
    table: &'a str,
    attempted: u64,
    written: u64,
    failed: u64,
}

impl<'a, S: TableStore + ?Sized> TolerantWriter<'a, S> {
    fn new(store: &'a S, table: &'a str) -> Self {
        Self {
            store,
            table,
            attempted: 0,
            written: 0,
            failed: 0,
        }
    }

    async fn write(&mut self, item: Item, progress: &dyn Progress) {
        self.attempted += 1;
        match self.store.put_item(self.table, item).await {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.failed += 1;
                let error = DumpError::ItemWrite {
                    table: self.table.to_string(),
                    source: Box::new(e),
                };
                warn!(table = %self.table, item = self.attempted, error = %error, "item write failed");
                progress.item_failed(self.table, &error);
            }
        }
        progress.item_processed(self.table, self.attempted);
    }
}

/// Stream the data artifact of `job` into its destination table.
///
/// Each write completes before the next item is read. With a nonzero row
/// limit exactly `row_limit` writes are attempted when the artifact holds
/// at least that many items. Rejected items are logged and skipped; parse
/// and read errors abort the job.
pub async fn import_data<S>(store: &S, job: &ImportJob, progress: &dyn Progress) -> Result<ImportSummary>
where
    S: TableStore + ?Sized,
{
    let path = data_path(&job.source_dir, &job.source_table);
    let stream = ItemStream::open(&path).await?;
    let mut items = Limited::new(stream, job.row_limit);
    let mut writer = TolerantWriter::new(store, &job.destination_table);

    let streamed = drive(&mut items, &mut writer, progress).await;
    items.close().await;

    if let Err(e) = streamed {
        error!(
            table = %job.destination_table,
            path = %path.display(),
            attempted = writer.attempted,
            error = %e,
            "import aborted"
        );
        return Err(e);
    }

    let outcome = if items.limit_reached() {
        ImportOutcome::LimitReached
    } else {
        ImportOutcome::SourceExhausted
    };

    info!(
        table = %job.destination_table,
        attempted = writer.attempted,
        written = writer.written,
        failed = writer.failed,
        outcome = ?outcome,
        "imported data"
    );

    Ok(ImportSummary {
        table: job.destination_table.clone(),
        attempted: writer.attempted,
        written: writer.written,
        failed: writer.failed,
        outcome,
    })
}

async fn drive<I, S>(items: &mut I, writer: &mut TolerantWriter<'_, S>, progress: &dyn Progress) -> Result<()>
where
    I: ItemSource,
    S: TableStore + ?Sized,
{
    while let Some(item) = items.next().await? {
        writer.write(item, progress).await;
    }
    Ok(())
}

/// Read the schema artifact, recreate the destination and import the data.
pub async fn import_table<S>(store: &S, job: &ImportJob, progress: &dyn Progress) -> Result<ImportSummary>
where
    S: TableStore + ?Sized,
{
    progress.table_started(Phase::Import, &job.destination_table);
    info!(
        source = %job.source_table,
        table = %job.destination_table,
        row_limit = job.row_limit,
        "importing table"
    );

    let snapshot = SchemaSnapshot::read(&schema_path(&job.source_dir, &job.source_table)).await?;
    let provisioned = ensure_fresh_table(store, &snapshot, &job.destination_table).await?;
    info!(table = %job.destination_table, provisioned = ?provisioned, "destination ready");

    let summary = import_data(store, job, progress).await?;
    progress.table_finished(Phase::Import, &job.destination_table, summary.written);
    Ok(summary)
}
