//! Export artifact writers.
//!
//! The data file is a JSON envelope written incrementally:
//!
//! ```text
//! { "data": [
//! {"id":{"S":"a"}},
//! {"id":{"S":"b"}}
//! ], "total": 2 }
//! ```
//!
//! Only one page of items is ever held in memory.

use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::conversions::item_to_json;
use crate::errors::{DumpError, Result};
use crate::schema::SchemaSnapshot;
use crate::store::Item;

const ENVELOPE_OPEN: &[u8] = b"{ \"data\": [";

/// `<dir>/<table>.json`
pub fn schema_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}.json", table))
}

/// `<dir>/<table>.data.json`
pub fn data_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}.data.json", table))
}

/// Write `snapshot` as pretty JSON to `<dir>/<table>.json`, overwriting it.
pub async fn write_schema(dir: &Path, snapshot: &SchemaSnapshot) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DumpError::io(dir, e))?;

    let path = schema_path(dir, &snapshot.table_name);
    let document = snapshot.to_document()?;
    tokio::fs::write(&path, document)
        .await
        .map_err(|e| DumpError::io(&path, e))?;
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvelopeState {
    Fresh,
    Open,
    /// The last page has been written; only `finish` is allowed.
    Sealed,
    Finished,
}

/// Streams items into a `{ "data": [...], "total": n }` envelope.
pub struct EnvelopeWriter<W> {
    out: W,
    path: PathBuf,
    state: EnvelopeState,
    written: u64,
    line: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> EnvelopeWriter<W> {
    /// `path` names the destination in errors.
    pub fn new(out: W, path: impl Into<PathBuf>) -> Self {
        Self {
            out,
            path: path.into(),
            state: EnvelopeState::Fresh,
            written: 0,
            line: Vec::new(),
        }
    }

    /// Items written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.out
            .write_all(bytes)
            .await
            .map_err(|e| DumpError::io(&self.path, e))
    }

    /// Write the envelope opening.
    pub async fn begin(&mut self) -> Result<()> {
        if self.state != EnvelopeState::Fresh {
            return Err(self.misuse("begin called twice"));
        }
        self.write_raw(ENVELOPE_OPEN).await?;
        self.state = EnvelopeState::Open;
        Ok(())
    }

    /// Append one scanned page.
    ///
    /// Items are comma separated across pages and no comma follows the last
    /// item of the export. After a page flagged `is_last_page` no more items
    /// are accepted.
    pub async fn write_items(&mut self, items: &[Item], is_last_page: bool) -> Result<()> {
        if self.state == EnvelopeState::Fresh {
            self.begin().await?;
        }
        if self.state != EnvelopeState::Open {
            return Err(self.misuse("items written after the last page"));
        }

        for item in items {
            let json = item_to_json(item).map_err(|reason| DumpError::malformed(&self.path, reason))?;

            self.line.clear();
            if self.written > 0 {
                self.line.push(b',');
            }
            self.line.push(b'\n');
            serde_json::to_writer(&mut self.line, &json)
                .map_err(|e| DumpError::malformed(&self.path, e))?;

            let line = std::mem::take(&mut self.line);
            let result = self.write_raw(&line).await;
            self.line = line;
            result?;
            self.written += 1;
        }

        if is_last_page {
            self.state = EnvelopeState::Sealed;
        }
        Ok(())
    }

    /// Close the array with the trailing total and flush.
    pub async fn finish(&mut self) -> Result<u64> {
        match self.state {
            EnvelopeState::Fresh => self.begin().await?,
            EnvelopeState::Finished => return Err(self.misuse("finish called twice")),
            EnvelopeState::Open | EnvelopeState::Sealed => {}
        }

        let closing = format!("\n], \"total\": {} }}\n", self.written);
        self.write_raw(closing.as_bytes()).await?;
        self.state = EnvelopeState::Finished;
        self.flush().await?;
        Ok(self.written)
    }

    /// Flush and shut down the underlying writer. Safe to call on any path.
    pub async fn close(&mut self) -> Result<()> {
        self.out
            .shutdown()
            .await
            .map_err(|e| DumpError::io(&self.path, e))
    }

    async fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .await
            .map_err(|e| DumpError::io(&self.path, e))
    }

    fn misuse(&self, what: &str) -> DumpError {
        DumpError::InvalidRequest(format!("{}: {}", self.path.display(), what))
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;
    use serde_json::Value;

    fn item(id: &str) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::S(id.to_string()));
        item
    }

    async fn render(pages: &[(Vec<Item>, bool)]) -> Value {
        let mut writer = EnvelopeWriter::new(Vec::new(), "mem.data.json");
        writer.begin().await.unwrap();
        for (items, last) in pages {
            writer.write_items(items, *last).await.unwrap();
        }
        writer.finish().await.unwrap();
        let bytes = writer.into_inner();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_export_is_valid() {
        let value = render(&[(Vec::new(), true)]).await;
        assert_eq!(value, serde_json::json!({"data": [], "total": 0}));
    }

    #[tokio::test]
    async fn items_across_pages_form_one_array() {
        let value = render(&[
            (vec![item("a"), item("b")], false),
            (vec![item("c")], true),
        ])
        .await;
        assert_eq!(value["total"], 3);
        let ids: Vec<_> = value["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"]["S"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_final_page_keeps_json_valid() {
        let value = render(&[(vec![item("a"), item("b")], false), (Vec::new(), true)]).await;
        assert_eq!(value["total"], 2);
        assert_eq!(value["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejects_items_after_last_page() {
        let mut writer = EnvelopeWriter::new(Vec::new(), "mem.data.json");
        writer.write_items(&[item("a")], true).await.unwrap();
        assert!(writer.write_items(&[item("b")], false).await.is_err());
        assert_eq!(writer.finish().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn no_comma_after_last_item() {
        let mut writer = EnvelopeWriter::new(Vec::new(), "mem.data.json");
        writer.write_items(&[item("a"), item("b")], true).await.unwrap();
        writer.finish().await.unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            text,
            "{ \"data\": [\n{\"id\":{\"S\":\"a\"}},\n{\"id\":{\"S\":\"b\"}}\n], \"total\": 2 }\n"
        );
    }
}
