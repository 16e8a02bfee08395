//! Cursor-driven full-table scan.

use tracing::debug;

use crate::errors::Result;
use crate::store::{Cursor, Item, TableStore};

/// One page of a scan, handed on before the next page is requested.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Item>,
    /// True when the store reported no continuation cursor.
    pub is_last: bool,
}

#[derive(Debug)]
enum ScanState {
    /// Next request starts at the cursor (`None` = first page).
    Pending(Option<Cursor>),
    Done,
}

/// Pulls pages of `table` one at a time until the store runs out of cursors.
///
/// Errors from the store abort the scan and are returned as-is; the scanner
/// is then finished.
pub struct Scanner<'a, S: TableStore + ?Sized> {
    store: &'a S,
    table: String,
    state: ScanState,
    pages: u64,
    items: u64,
}

impl<'a, S: TableStore + ?Sized> Scanner<'a, S> {
    pub fn new(store: &'a S, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            state: ScanState::Pending(None),
            pages: 0,
            items: 0,
        }
    }

    /// Fetch the next page, or `None` once the last page has been returned.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let cursor = match std::mem::replace(&mut self.state, ScanState::Done) {
            ScanState::Pending(cursor) => cursor,
            ScanState::Done => return Ok(None),
        };

        let page = self.store.scan(&self.table, cursor).await?;
        self.pages += 1;
        self.items += page.items.len() as u64;

        let is_last = page.next_cursor.is_none();
        if !is_last {
            self.state = ScanState::Pending(page.next_cursor);
        }

        debug!(
            table = %self.table,
            page = self.pages,
            items = page.items.len(),
            total = self.items,
            is_last,
            "scanned page"
        );

        Ok(Some(Page {
            items: page.items,
            is_last,
        }))
    }

    /// Items seen so far.
    pub fn items_scanned(&self) -> u64 {
        self.items
    }

    pub fn pages_scanned(&self) -> u64 {
        self.pages
    }
}
