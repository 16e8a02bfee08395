//! Create-table request built from a schema snapshot.

use crate::schema::{AttributeDefinition, IndexDef, KeyElement, SchemaSnapshot, Throughput};

/// Prepared create_table data.
///
/// Every field is an owned copy taken from the source snapshot, so the
/// request can be handed to the store without touching the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCreateTable {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeyElement>,
    pub throughput: Throughput,
    pub global_secondary_indexes: Option<Vec<IndexDef>>,
    pub local_secondary_indexes: Option<Vec<IndexDef>>,
}

/// Prepare create_table for `table_name` with the schema of `snapshot`.
///
/// Throughput of the table and of each GSI falls back to 1/1 when the
/// source reported none (on-demand). LSIs never carry throughput.
pub fn prepare_create_table(snapshot: &SchemaSnapshot, table_name: &str) -> PreparedCreateTable {
    let global_secondary_indexes = snapshot
        .global_secondary_indexes
        .as_ref()
        .filter(|indexes| !indexes.is_empty())
        .map(|indexes| {
            indexes
                .iter()
                .map(|gsi| IndexDef {
                    index_name: gsi.index_name.clone(),
                    key_schema: gsi.key_schema.to_vec(),
                    projection: gsi.projection.clone(),
                    provisioned_throughput: Some(
                        gsi.provisioned_throughput.unwrap_or_default().or_minimum(),
                    ),
                })
                .collect()
        });

    let local_secondary_indexes = snapshot
        .local_secondary_indexes
        .as_ref()
        .filter(|indexes| !indexes.is_empty())
        .map(|indexes| {
            indexes
                .iter()
                .map(|lsi| IndexDef {
                    index_name: lsi.index_name.clone(),
                    key_schema: lsi.key_schema.to_vec(),
                    projection: lsi.projection.clone(),
                    provisioned_throughput: None,
                })
                .collect()
        });

    PreparedCreateTable {
        table_name: table_name.to_string(),
        attribute_definitions: snapshot.attribute_definitions.to_vec(),
        key_schema: snapshot.key_schema.to_vec(),
        throughput: snapshot.provisioned_throughput.or_minimum(),
        global_secondary_indexes,
        local_secondary_indexes,
    }
}

impl PreparedCreateTable {
    /// The schema a table created from this request reports.
    pub fn to_snapshot(&self) -> SchemaSnapshot {
        SchemaSnapshot {
            table_name: self.table_name.clone(),
            attribute_definitions: self.attribute_definitions.clone(),
            key_schema: self.key_schema.clone(),
            provisioned_throughput: self.throughput,
            global_secondary_indexes: self.global_secondary_indexes.clone(),
            local_secondary_indexes: self.local_secondary_indexes.clone(),
        }
    }
}
