//! Walking offset/limit paged collections.
//!
//! A [`PageWalker`] yields every item of a collection one at a time, fetching
//! pages strictly in sequence. It stops after the first page that comes back
//! shorter than requested (or empty) and cannot be rewound; build a new walker
//! to start again from offset 0.

use crate::params::Params;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

/// Page size requested when the caller does not pass `limit`.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// One page of a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Items on this page, in server order
    #[serde(default)]
    pub items: Vec<Value>,
    /// Paging metadata, when the appliance sends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

/// Paging metadata of a [`Page`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Offset of the first item
    #[serde(default)]
    pub offset: u64,
    /// Requested page size
    #[serde(default)]
    pub limit: u64,
    /// Number of items on this page
    #[serde(default)]
    pub count: u64,
}

/// Something that can return one page for a set of list parameters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page addressed by the `offset` and `limit` in `params`.
    async fn fetch_page(&self, params: &Params) -> Result<Page>;
}

/// Lazily yields every item of a paged collection.
pub struct PageWalker<'a, S: PageSource + ?Sized> {
    source: &'a S,
    params: Params,
    offset: u64,
    limit: u64,
    buffer: VecDeque<Value>,
    exhausted: bool,
}

impl<'a, S: PageSource + ?Sized> PageWalker<'a, S> {
    /// Start a walk from offset 0 using `search` as list parameters.
    ///
    /// `search` keeps its `limit` (defaulting to [`DEFAULT_PAGE_LIMIT`]); any
    /// `offset` it carries is ignored.
    #[must_use]
    pub fn new(source: &'a S, search: &Params) -> Self {
        let limit = search
            .get_u64("limit")
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        Self {
            source,
            params: search.clone(),
            offset: 0,
            limit,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next item, or `None` once the collection is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates the error of the page fetch.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }

    /// First item matching `predicate`, consuming the walker.
    ///
    /// Stops fetching pages as soon as a match is found.
    ///
    /// # Errors
    ///
    /// Propagates the error of any page fetch.
    pub async fn find<P>(mut self, mut predicate: P) -> Result<Option<Value>>
    where
        P: FnMut(&Value) -> bool + Send,
    {
        while let Some(item) = self.next().await? {
            if predicate(&item) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Every remaining item, consuming the walker.
    ///
    /// # Errors
    ///
    /// Propagates the error of any page fetch.
    pub async fn collect(mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let mut params = self.params.clone();
        params.insert("offset", self.offset);
        params.insert("limit", self.limit);

        debug!(offset = self.offset, limit = self.limit, "fetching page");
        let page = self.source.fetch_page(&params).await?;
        let fetched = page.items.len() as u64;

        if fetched == 0 || fetched < self.limit {
            self.exhausted = true;
        }
        self.offset += fetched;
        self.buffer.extend(page.items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::function;
    use mockall::Sequence;
    use serde_json::json;

    fn page(range: std::ops::Range<u64>) -> Page {
        Page {
            items: range.map(|i| json!({"id": i.to_string(), "name": format!("item-{i}")})).collect(),
            paging: None,
        }
    }

    fn at(offset: u64, limit: u64) -> impl Fn(&Params) -> bool {
        move |params: &Params| {
            params.get_u64("offset") == Some(offset) && params.get_u64("limit") == Some(limit)
        }
    }

    #[tokio::test]
    async fn walks_full_pages_then_partial() {
        let mut source = MockPageSource::new();
        let mut seq = Sequence::new();
        source
            .expect_fetch_page()
            .with(function(at(0, 3)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(0..3)));
        source
            .expect_fetch_page()
            .with(function(at(3, 3)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(3..6)));
        source
            .expect_fetch_page()
            .with(function(at(6, 3)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(6..8)));

        let search: Params = [("limit", json!(3))].into_iter().collect();
        let items = PageWalker::new(&source, &search).collect().await.unwrap();

        assert_eq!(items.len(), 8);
        let ids: Vec<&str> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5", "6", "7"]);
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let mut source = MockPageSource::new();
        let mut seq = Sequence::new();
        source
            .expect_fetch_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(0..10)));
        source
            .expect_fetch_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Page::default()));

        let items = PageWalker::new(&source, &Params::new())
            .collect()
            .await
            .unwrap();
        assert_eq!(items.len(), 10);
    }

    #[tokio::test]
    async fn default_limit_and_fresh_offset() {
        let mut source = MockPageSource::new();
        source
            .expect_fetch_page()
            .with(function(at(0, DEFAULT_PAGE_LIMIT)))
            .times(1)
            .returning(|_| Ok(Page::default()));

        let search: Params = [("offset", json!(40)), ("filter", json!("name:x"))]
            .into_iter()
            .collect();
        let items = PageWalker::new(&source, &search).collect().await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn find_stops_fetching_after_match() {
        let mut source = MockPageSource::new();
        source
            .expect_fetch_page()
            .times(1)
            .returning(|_| Ok(page(0..2)));

        let search: Params = [("limit", json!(2))].into_iter().collect();
        let found = PageWalker::new(&source, &search)
            .find(|item| item["name"] == "item-1")
            .await
            .unwrap();
        assert_eq!(found.unwrap()["id"], "1");
    }

    #[tokio::test]
    async fn find_returns_none_when_exhausted() {
        let mut source = MockPageSource::new();
        source
            .expect_fetch_page()
            .times(1)
            .returning(|_| Ok(page(0..1)));

        let found = PageWalker::new(&source, &Params::new())
            .find(|item| item["name"] == "missing")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn page_error_propagates() {
        let mut source = MockPageSource::new();
        source.expect_fetch_page().times(1).returning(|_| {
            Err(crate::Error::Http {
                status: 500,
                body: String::new(),
            })
        });

        let mut walker = PageWalker::new(&source, &Params::new());
        let err = walker.next().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn page_deserializes_fdm_paging() {
        let page: Page = serde_json::from_value(json!({
            "items": [{"id": "1"}],
            "paging": {"prev": [], "next": [], "limit": 10, "offset": 0, "count": 1, "pages": 0}
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.paging.unwrap().count, 1);
    }
}
