//! Row cap on an item source.

use async_trait::async_trait;

use crate::errors::Result;
use crate::import::reader::ItemSource;
use crate::store::Item;

/// Yields at most `limit` items of `inner` (0 = no cap).
///
/// Once the cap is met the inner source is stopped before anything more is
/// pulled from it.
pub struct Limited<S> {
    inner: S,
    limit: u64,
    taken: u64,
    reached: bool,
}

impl<S: ItemSource> Limited<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            limit,
            taken: 0,
            reached: false,
        }
    }

    /// Items handed out so far.
    pub fn taken(&self) -> u64 {
        self.taken
    }

    /// True once the cap stopped the source.
    pub fn limit_reached(&self) -> bool {
        self.reached
    }
}

#[async_trait]
impl<S: ItemSource> ItemSource for Limited<S> {
    async fn next(&mut self) -> Result<Option<Item>> {
        if self.limit > 0 && self.taken >= self.limit {
            if !self.reached {
                self.reached = true;
                self.inner.stop();
            }
            return Ok(None);
        }

        let item = self.inner.next().await?;
        if item.is_some() {
            self.taken += 1;
        }
        Ok(item)
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;
    use std::collections::VecDeque;

    /// Counts how many items were pulled from it.
    struct VecSource {
        items: VecDeque<Item>,
        pulled: usize,
        stopped: bool,
    }

    impl VecSource {
        fn new(count: usize) -> Self {
            let items = (0..count)
                .map(|i| {
                    let mut item = Item::new();
                    item.insert("id".to_string(), AttributeValue::N(i.to_string()));
                    item
                })
                .collect();
            Self {
                items,
                pulled: 0,
                stopped: false,
            }
        }
    }

    #[async_trait]
    impl ItemSource for VecSource {
        async fn next(&mut self) -> Result<Option<Item>> {
            if self.stopped {
                return Ok(None);
            }
            let item = self.items.pop_front();
            if item.is_some() {
                self.pulled += 1;
            }
            Ok(item)
        }

        fn stop(&mut self) {
            self.stopped = true;
        }

        async fn close(&mut self) {
            self.stopped = true;
        }
    }

    async fn drain<S: ItemSource>(source: &mut S) -> u64 {
        let mut count = 0;
        while source.next().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn cap_below_source_size() {
        let mut limited = Limited::new(VecSource::new(10), 3);
        assert_eq!(drain(&mut limited).await, 3);
        assert!(limited.limit_reached());
        assert_eq!(limited.inner.pulled, 3);
        assert!(limited.inner.stopped);
    }

    #[tokio::test]
    async fn cap_equal_to_source_size() {
        let mut limited = Limited::new(VecSource::new(4), 4);
        assert_eq!(drain(&mut limited).await, 4);
        assert!(limited.limit_reached());
    }

    #[tokio::test]
    async fn cap_above_source_size() {
        let mut limited = Limited::new(VecSource::new(4), 9);
        assert_eq!(drain(&mut limited).await, 4);
        assert!(!limited.limit_reached());
    }

    #[tokio::test]
    async fn zero_means_unbounded() {
        let mut limited = Limited::new(VecSource::new(25), 0);
        assert_eq!(drain(&mut limited).await, 25);
        assert!(!limited.limit_reached());
        assert_eq!(limited.taken(), 25);
    }
}
