//! Access to the remote append-only ledger.
//!
//! `LedgerSource` is the seam between the pipeline and the transport: the
//! HTTP client talks to a real gateway, `MockLedger` serves fixtures.

pub mod client;
pub mod fetcher;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{LedgerTransaction, UnifiedAuthorBlob};

pub use client::{mutable_address, HttpLedgerClient};
pub use fetcher::{FetchReport, RecordFetcher};
#[cfg(test)]
pub(crate) use mock::MockLedger;

/// One `name in [values]` condition of a tag query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub name: String,
    pub values: Vec<String>,
}

/// Conjunction of tag filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    pub filters: Vec<TagFilter>,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(TagFilter {
            name: name.into(),
            values: vec![value.into()],
        });
        self
    }

    pub fn matches(&self, tx: &LedgerTransaction) -> bool {
        self.filters.iter().all(|filter| {
            tx.tags
                .iter()
                .any(|tag| tag.name == filter.name && filter.values.contains(&tag.value))
        })
    }
}

#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// All transactions matching `query`, across every result page.
    async fn query(&self, query: &TagQuery) -> Result<Vec<LedgerTransaction>>;

    /// Fetch the current blob at the mutable address derived from `tx_id`.
    async fn fetch_blob(&self, tx_id: &str) -> Result<UnifiedAuthorBlob>;

    /// Address `fetch_blob` reads for `tx_id`.
    fn blob_url(&self, tx_id: &str) -> String;

    /// Base URL individual records link back to.
    fn gateway_url(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;

    #[test]
    fn test_tag_query_matches_all_filters() {
        let tx = LedgerTransaction::new(
            "t",
            vec![Tag::new("App-Name", "A"), Tag::new("Project", "demo")],
            None,
        );
        assert!(TagQuery::new().tag("App-Name", "A").matches(&tx));
        assert!(TagQuery::new()
            .tag("App-Name", "A")
            .tag("Project", "demo")
            .matches(&tx));
        assert!(!TagQuery::new()
            .tag("App-Name", "A")
            .tag("Project", "other")
            .matches(&tx));
        assert!(TagQuery::new().matches(&tx));
    }
}
