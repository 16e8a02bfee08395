//! Export of one table: schema first, then data.

use std::path::{Path, PathBuf};
use tokio::io::BufWriter;
use tracing::{error, info};

use crate::errors::{DumpError, Result};
use crate::export::scanner::Scanner;
use crate::export::writer::{EnvelopeWriter, data_path, write_schema};
use crate::progress::{Phase, Progress};
use crate::store::TableStore;

/// Result of exporting one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub table: String,
    pub schema_path: PathBuf,
    pub data_path: PathBuf,
    pub items: u64,
    pub pages: u64,
}

/// Export `table` into `<dir>/<table>.json` and `<dir>/<table>.data.json`.
///
/// The schema file is written completely before scanning starts. The data
/// file is flushed and closed whether or not the scan succeeds.
pub async fn export_table<S>(
    store: &S,
    table: &str,
    dir: &Path,
    progress: &dyn Progress,
) -> Result<ExportSummary>
where
    S: TableStore + ?Sized,
{
    progress.table_started(Phase::Export, table);

    let snapshot = store.describe_table(table).await?;
    let schema_path = write_schema(dir, &snapshot).await?;

    let data_path = data_path(dir, table);
    let file = tokio::fs::File::create(&data_path)
        .await
        .map_err(|e| DumpError::io(&data_path, e))?;
    let mut writer = EnvelopeWriter::new(BufWriter::new(file), &data_path);
    let mut scanner = Scanner::new(store, table);

    let streamed = stream_pages(&mut scanner, &mut writer, table, progress).await;
    let closed = writer.close().await;

    let items = match (streamed, closed) {
        (Ok(items), Ok(())) => items,
        (Err(e), _) | (Ok(_), Err(e)) => {
            error!(table = %table, error = %e, "export failed");
            return Err(e);
        }
    };

    info!(table = %table, items, pages = scanner.pages_scanned(), "exported table");
    progress.table_finished(Phase::Export, table, items);

    Ok(ExportSummary {
        table: table.to_string(),
        schema_path,
        data_path,
        items,
        pages: scanner.pages_scanned(),
    })
}

async fn stream_pages<S, W>(
    scanner: &mut Scanner<'_, S>,
    writer: &mut EnvelopeWriter<W>,
    table: &str,
    progress: &dyn Progress,
) -> Result<u64>
where
    S: TableStore + ?Sized,
    W: tokio::io::AsyncWrite + Unpin,
{
    writer.begin().await?;
    while let Some(page) = scanner.next_page().await? {
        writer.write_items(&page.items, page.is_last).await?;
        if !page.items.is_empty() {
            progress.item_processed(table, writer.written());
        }
    }
    writer.finish().await
}
