//! Drop-and-recreate of an import destination.

use tracing::{debug, info};

use crate::errors::Result;
use crate::schema::SchemaSnapshot;
use crate::store::TableStore;
use crate::table_operations::create::prepare_create_table;

/// What `ensure_fresh_table` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// A new table was created from the snapshot.
    Created,
    /// A table with the destination name was still present after the
    /// delete step; it is imported into as-is.
    AlreadyPresent,
}

/// Make sure `destination` exists with the schema of `snapshot`.
///
/// An existing table is deleted first. Deleting a table that is already
/// gone is not an error. Create is skipped if the name is still taken
/// afterwards.
pub async fn ensure_fresh_table<S>(
    store: &S,
    snapshot: &SchemaSnapshot,
    destination: &str,
) -> Result<Provisioned>
where
    S: TableStore + ?Sized,
{
    if store.table_exists(destination).await? {
        info!(table = %destination, "deleting existing table");
        match store.delete_table(destination).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(table = %destination, "table vanished before delete");
            }
            Err(e) => return Err(e),
        }
    }

    if store.table_exists(destination).await? {
        info!(table = %destination, "table still present, importing into it as-is");
        return Ok(Provisioned::AlreadyPresent);
    }

    let request = prepare_create_table(snapshot, destination);
    info!(
        table = %destination,
        source = %snapshot.table_name,
        gsis = request.global_secondary_indexes.as_ref().map_or(0, Vec::len),
        lsis = request.local_secondary_indexes.as_ref().map_or(0, Vec::len),
        "creating table"
    );
    store.create_table(&request).await?;
    Ok(Provisioned::Created)
}
