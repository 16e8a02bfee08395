//! All-table and single-table flows.
//!
//! Tables are handled one after another. The first error that escapes a
//! table operation ends the run.

use tracing::info;

use crate::config::{ExportAllOptions, ImportAllOptions, ImportSingleOptions};
use crate::discovery::{RenameRule, find_local_export_pairs, list_remote_tables};
use crate::errors::Result;
use crate::export::{ExportSummary, export_table};
use crate::import::{ImportJob, ImportSummary, import_table};
use crate::progress::Progress;
use crate::store::TableStore;

/// Export every table in the store that is not ignored.
pub async fn export_all<S>(
    store: &S,
    options: &ExportAllOptions,
    progress: &dyn Progress,
) -> Result<Vec<ExportSummary>>
where
    S: TableStore + ?Sized,
{
    let tables = list_remote_tables(store, &options.ignore).await?;
    info!(tables = tables.len(), dir = %options.export_dir.display(), "exporting all tables");

    let mut summaries = Vec::with_capacity(tables.len());
    for table in &tables {
        summaries.push(export_table(store, table, &options.export_dir, progress).await?);
    }
    Ok(summaries)
}

/// Import every artifact pair found in the import directory.
///
/// Destination names are the artifact names passed through the rename rule.
pub async fn import_all<S>(
    store: &S,
    options: &ImportAllOptions,
    progress: &dyn Progress,
) -> Result<Vec<ImportSummary>>
where
    S: TableStore + ?Sized,
{
    let rule = RenameRule::new(&options.rename_pattern, options.rename_replacement.as_str())?;
    let sources = find_local_export_pairs(&options.import_dir).await?;
    info!(tables = sources.len(), dir = %options.import_dir.display(), "importing all tables");

    let mut summaries = Vec::with_capacity(sources.len());
    for source in sources {
        let job = ImportJob {
            source_dir: options.import_dir.clone(),
            destination_table: rule.apply(&source),
            source_table: source,
            row_limit: options.row_limit,
        };
        summaries.push(import_table(store, &job, progress).await?);
    }
    Ok(summaries)
}

/// Import one artifact pair, optionally under a different table name.
pub async fn import_single<S>(
    store: &S,
    options: &ImportSingleOptions,
    progress: &dyn Progress,
) -> Result<ImportSummary>
where
    S: TableStore + ?Sized,
{
    let job = ImportJob {
        source_dir: options.import_dir.clone(),
        source_table: options.source_table.clone(),
        destination_table: options.destination().to_string(),
        row_limit: options.row_limit,
    };
    import_table(store, &job, progress).await
}
