//! In-process table store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{DumpError, Result, TransportKind};
use crate::schema::SchemaSnapshot;
use crate::store::{Cursor, Item, ScanPage, TableStore};
use crate::table_operations::PreparedCreateTable;

const DEFAULT_PAGE_SIZE: usize = 100;

type PutFilter = Box<dyn Fn(&Item) -> bool + Send + Sync>;

struct MemoryTable {
    schema: SchemaSnapshot,
    items: Vec<Item>,
}

impl MemoryTable {
    fn key_of(&self, item: &Item) -> Result<Cursor> {
        let mut key = Cursor::new();
        for element in &self.schema.key_schema {
            let value = item.get(&element.attribute_name).ok_or_else(|| {
                DumpError::transport(
                    "PutItem",
                    Some(&self.schema.table_name),
                    TransportKind::Validation,
                    format!("missing key attribute '{}'", element.attribute_name),
                )
            })?;
            key.insert(element.attribute_name.clone(), value.clone());
        }
        Ok(key)
    }

    fn position_of(&self, key: &Cursor) -> Option<usize> {
        self.items.iter().position(|item| {
            key.iter()
                .all(|(name, value)| item.get(name) == Some(value))
        })
    }
}

/// An in-memory implementation of [`TableStore`].
///
/// Items are kept in insertion order per table and scanned in pages of a
/// configurable size. Put rejection and scan failure can be injected to
/// exercise error paths.
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, MemoryTable>>,
    page_size: usize,
    cursor_on_full_pages: bool,
    put_filter: Option<PutFilter>,
    fail_scan_at: Option<usize>,
    scan_calls: AtomicUsize,
    put_attempts: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            cursor_on_full_pages: false,
            put_filter: None,
            fail_scan_at: None,
            scan_calls: AtomicUsize::new(0),
            put_attempts: AtomicUsize::new(0),
        }
    }

    /// Maximum items per scan page (at least 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Return a cursor whenever a page is full, even if it ends the table.
    ///
    /// DynamoDB does this when the page limit lands on the last item; the
    /// next scan then yields an empty final page.
    pub fn with_cursor_on_full_pages(mut self, enabled: bool) -> Self {
        self.cursor_on_full_pages = enabled;
        self
    }

    /// Reject every put whose item matches `filter` with a validation error.
    pub fn with_put_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Item) -> bool + Send + Sync + 'static,
    {
        self.put_filter = Some(Box::new(filter));
        self
    }

    /// Fail the `call`-th scan request (0-based) with a connection error.
    pub fn with_scan_failure_at(mut self, call: usize) -> Self {
        self.fail_scan_at = Some(call);
        self
    }

    /// Seed a table with `items`, replacing any table of the same name.
    pub fn insert_table(&self, schema: SchemaSnapshot, items: Vec<Item>) {
        let name = schema.table_name.clone();
        self.write().insert(name, MemoryTable { schema, items });
    }

    /// Snapshot of the items currently stored in `table`.
    pub fn items(&self, table: &str) -> Option<Vec<Item>> {
        self.read().get(table).map(|t| t.items.clone())
    }

    /// Number of put_item calls received, accepted or not.
    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.read().keys().cloned().collect())
    }

    async fn describe_table(&self, table: &str) -> Result<SchemaSnapshot> {
        self.read()
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| DumpError::TableNotFound(table.to_string()))
    }

    async fn create_table(&self, request: &PreparedCreateTable) -> Result<()> {
        let mut tables = self.write();
        if tables.contains_key(&request.table_name) {
            return Err(DumpError::transport(
                "CreateTable",
                Some(&request.table_name),
                TransportKind::ResourceInUse,
                "table already exists",
            ));
        }
        tables.insert(
            request.table_name.clone(),
            MemoryTable {
                schema: request.to_snapshot(),
                items: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        self.write()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| DumpError::TableNotFound(table.to_string()))
    }

    async fn scan(&self, table: &str, cursor: Option<Cursor>) -> Result<ScanPage> {
        let call = self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_scan_at == Some(call) {
            return Err(DumpError::transport(
                "Scan",
                Some(table),
                TransportKind::Connection,
                "injected scan failure",
            ));
        }

        let tables = self.read();
        let stored = tables
            .get(table)
            .ok_or_else(|| DumpError::TableNotFound(table.to_string()))?;

        let start = match cursor {
            Some(key) => stored
                .position_of(&key)
                .map_or(stored.items.len(), |pos| pos + 1),
            None => 0,
        };
        let end = (start + self.page_size).min(stored.items.len());
        let items = stored.items[start..end].to_vec();

        let more = end < stored.items.len()
            || (self.cursor_on_full_pages && items.len() == self.page_size);
        let next_cursor = match items.last() {
            Some(last) if more => Some(stored.key_of(last)?),
            _ => None,
        };

        Ok(ScanPage { items, next_cursor })
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(filter) = &self.put_filter {
            if filter(&item) {
                return Err(DumpError::transport(
                    "PutItem",
                    Some(table),
                    TransportKind::Validation,
                    "item rejected",
                ));
            }
        }

        let mut tables = self.write();
        let stored = tables
            .get_mut(table)
            .ok_or_else(|| DumpError::TableNotFound(table.to_string()))?;

        let key = stored.key_of(&item)?;
        match stored.position_of(&key) {
            Some(pos) => stored.items[pos] = item,
            None => stored.items.push(item),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{KeyElement, KeyType, Throughput};
    use aws_sdk_dynamodb::types::AttributeValue;

    fn schema(name: &str) -> SchemaSnapshot {
        SchemaSnapshot {
            table_name: name.to_string(),
            attribute_definitions: Vec::new(),
            key_schema: vec![KeyElement {
                attribute_name: "id".to_string(),
                key_type: KeyType::Hash,
            }],
            provisioned_throughput: Throughput::default(),
            global_secondary_indexes: None,
            local_secondary_indexes: None,
        }
    }

    fn item(id: usize) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::N(id.to_string()));
        item
    }

    #[tokio::test]
    async fn scan_pages_follow_cursor() {
        let store = MemoryStore::new().with_page_size(2);
        store.insert_table(schema("t"), (0..5).map(item).collect());

        let first = store.scan("t", None).await.unwrap();
        assert_eq!(first.items, vec![item(0), item(1)]);

        let second = store.scan("t", first.next_cursor).await.unwrap();
        assert_eq!(second.items, vec![item(2), item(3)]);

        let last = store.scan("t", second.next_cursor).await.unwrap();
        assert_eq!(last.items, vec![item(4)]);
        assert!(last.next_cursor.is_none());
    }

    #[tokio::test]
    async fn full_last_page_can_carry_cursor() {
        let store = MemoryStore::new()
            .with_page_size(2)
            .with_cursor_on_full_pages(true);
        store.insert_table(schema("t"), (0..2).map(item).collect());

        let first = store.scan("t", None).await.unwrap();
        assert!(first.next_cursor.is_some());

        let empty = store.scan("t", first.next_cursor).await.unwrap();
        assert!(empty.items.is_empty());
        assert!(empty.next_cursor.is_none());
    }

    #[tokio::test]
    async fn put_replaces_same_key() {
        let store = MemoryStore::new();
        store.insert_table(schema("t"), Vec::new());

        let mut updated = item(1);
        updated.insert("v".to_string(), AttributeValue::Bool(true));
        store.put_item("t", item(1)).await.unwrap();
        store.put_item("t", updated.clone()).await.unwrap();

        assert_eq!(store.items("t").unwrap(), vec![updated]);
        assert_eq!(store.put_attempts(), 2);
    }

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_table("ghost").await.unwrap_err();
        assert!(err.is_not_found());
        let err = store.put_item("ghost", item(1)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
