//! Incremental reader for data envelopes.
//!
//! A blocking task walks the file with `serde_json`, picks the `data` array
//! of the envelope and hands its elements one at a time through a channel
//! of capacity 1. The async side pulls them with [`ItemSource::next`], so
//! the parser never runs more than one element ahead of the consumer.

use async_trait::async_trait;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};
use std::fmt;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::conversions::json_to_item;
use crate::errors::{DumpError, Result};
use crate::store::Item;

const STREAM_CLOSED: &str = "item stream closed by consumer";

type Element = Map<String, Value>;
type ElementSender = mpsc::Sender<Result<Element>>;

/// A pull-based source of items.
#[async_trait]
pub trait ItemSource: Send {
    /// The next item, or `None` when the source is exhausted or stopped.
    async fn next(&mut self) -> Result<Option<Item>>;

    /// Tell the producer to stop. Later `next` calls return `None`.
    fn stop(&mut self);

    /// Stop and wait until everything the source holds is released.
    async fn close(&mut self);
}

/// Items of the `data` array of an envelope file, parsed on demand.
pub struct ItemStream {
    rx: mpsc::Receiver<Result<Element>>,
    parser: Option<JoinHandle<()>>,
    path: PathBuf,
    delivered: u64,
    stopped: bool,
}

impl ItemStream {
    /// Open the envelope at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| DumpError::io(&path, e))?
            .into_std()
            .await;
        Ok(Self::from_reader(BufReader::new(file), path))
    }

    /// Parse an envelope from any blocking reader. `path` names it in errors.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn from_reader<R>(reader: R, path: impl Into<PathBuf>) -> Self
    where
        R: Read + Send + 'static,
    {
        let path = path.into();
        let (tx, rx) = mpsc::channel(1);
        let parse_path = path.clone();
        let parser = tokio::task::spawn_blocking(move || parse_envelope(reader, &parse_path, &tx));

        Self {
            rx,
            parser: Some(parser),
            path,
            delivered: 0,
            stopped: false,
        }
    }

    /// Items handed out so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[async_trait]
impl ItemSource for ItemStream {
    async fn next(&mut self) -> Result<Option<Item>> {
        if self.stopped {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(Ok(element)) => {
                let item = json_to_item(&element).map_err(|reason| {
                    DumpError::malformed(&self.path, format!("item {}: {}", self.delivered, reason))
                })?;
                self.delivered += 1;
                Ok(Some(item))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.rx.close();
    }

    async fn close(&mut self) {
        self.stop();
        if let Some(parser) = self.parser.take() {
            if let Err(e) = parser.await {
                warn!(path = %self.path.display(), error = %e, "envelope parser task failed");
            }
        }
    }
}

fn parse_envelope<R: Read>(reader: R, path: &Path, tx: &ElementSender) {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let parsed = (&mut de)
        .deserialize_map(EnvelopeVisitor { tx })
        .and_then(|summary| de.end().map(|()| summary));

    match parsed {
        Ok(summary) if !summary.saw_data => {
            let _ = tx.blocking_send(Err(DumpError::malformed(path, "envelope has no `data` array")));
        }
        Ok(summary) => {
            if let Some(total) = summary.total.filter(|total| *total != summary.items) {
                warn!(
                    path = %path.display(),
                    items = summary.items,
                    total,
                    "envelope total does not match its data"
                );
            }
            debug!(path = %path.display(), items = summary.items, "parsed envelope");
        }
        Err(_) if tx.is_closed() => {
            debug!(path = %path.display(), "envelope parsing stopped early");
        }
        Err(e) => {
            let error = if e.is_io() {
                DumpError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(e),
                }
            } else {
                DumpError::malformed(path, e)
            };
            let _ = tx.blocking_send(Err(error));
        }
    }
}

#[derive(Debug, Default)]
struct EnvelopeSummary {
    saw_data: bool,
    items: u64,
    total: Option<u64>,
}

struct EnvelopeVisitor<'a> {
    tx: &'a ElementSender,
}

impl<'de> Visitor<'de> for EnvelopeVisitor<'_> {
    type Value = EnvelopeSummary;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an export envelope object with a `data` array")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut summary = EnvelopeSummary::default();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "data" if summary.saw_data => return Err(de::Error::duplicate_field("data")),
                "data" => {
                    summary.items = map.next_value_seed(DataSeed { tx: self.tx })?;
                    summary.saw_data = true;
                }
                "total" => summary.total = map.next_value::<Value>()?.as_u64(),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(summary)
    }
}

/// Forwards each element of the `data` array to the consumer.
struct DataSeed<'a> {
    tx: &'a ElementSender,
}

impl<'de> DeserializeSeed<'de> for DataSeed<'_> {
    type Value = u64;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<u64, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for DataSeed<'_> {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of item objects")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<u64, A::Error> {
        let mut count = 0;
        while let Some(element) = seq.next_element::<Element>()? {
            if self.tx.blocking_send(Ok(element)).is_err() {
                return Err(de::Error::custom(STREAM_CLOSED));
            }
            count += 1;
        }
        Ok(count)
    }
}
