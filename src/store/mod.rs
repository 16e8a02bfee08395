//! Store client seam.
//!
//! Everything above this module talks to a table store through
//! [`TableStore`]:
//! - `dynamo` - DynamoDB over `aws-sdk-dynamodb`
//! - `memory` - in-process store for tests and offline runs

mod dynamo;
mod memory;

pub use dynamo::{DynamoStore, WaitConfig};
pub use memory::MemoryStore;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::errors::Result;
use crate::schema::SchemaSnapshot;
use crate::table_operations::PreparedCreateTable;

/// One row in store-native form.
pub type Item = HashMap<String, AttributeValue>;

/// Continuation token of a paginated scan (`LastEvaluatedKey`).
pub type Cursor = HashMap<String, AttributeValue>;

/// One page returned by a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// `None` once the table has no more pages.
    pub next_cursor: Option<Cursor>,
}

/// The table operations backup and restore need from a store.
///
/// All calls may fail; none of them retry on their own.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Names of every table, following the store's pagination to the end.
    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn describe_table(&self, table: &str) -> Result<SchemaSnapshot>;

    async fn create_table(&self, request: &PreparedCreateTable) -> Result<()>;

    async fn delete_table(&self, table: &str) -> Result<()>;

    /// Fetch the page that starts after `cursor` (or the first page).
    async fn scan(&self, table: &str, cursor: Option<Cursor>) -> Result<ScanPage>;

    async fn put_item(&self, table: &str, item: Item) -> Result<()>;

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.list_tables().await?.iter().any(|name| name == table))
    }
}
