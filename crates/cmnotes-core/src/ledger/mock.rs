//! In-memory `LedgerSource` for tests without a real gateway.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{mutable_address, LedgerSource, TagQuery};
use crate::error::{NotesError, Result};
use crate::models::{LedgerTransaction, UnifiedAuthorBlob};

const MOCK_GATEWAY: &str = "https://ledger.mock";

/// Serves programmed transactions and blobs. Queries filter with
/// `TagQuery::matches`; blob ids marked with `fail_blob` return a 503.
pub struct MockLedger {
    transactions: RwLock<Vec<LedgerTransaction>>,
    blobs: RwLock<HashMap<String, UnifiedAuthorBlob>>,
    failing_blobs: RwLock<HashSet<String>>,
    fail_queries: AtomicBool,
    query_delay: RwLock<Option<Duration>>,
    query_count: AtomicUsize,
    blob_fetch_count: AtomicUsize,
    blob_delay: RwLock<Option<Duration>>,
    blobs_in_flight: AtomicUsize,
    max_blobs_in_flight: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            transactions: RwLock::new(Vec::new()),
            blobs: RwLock::new(HashMap::new()),
            failing_blobs: RwLock::new(HashSet::new()),
            fail_queries: AtomicBool::new(false),
            query_delay: RwLock::new(None),
            query_count: AtomicUsize::new(0),
            blob_fetch_count: AtomicUsize::new(0),
            blob_delay: RwLock::new(None),
            blobs_in_flight: AtomicUsize::new(0),
            max_blobs_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn add_transaction(&self, tx: LedgerTransaction) {
        self.transactions.write().push(tx);
    }

    pub fn add_blob(&self, tx_id: &str, blob: UnifiedAuthorBlob) {
        self.blobs.write().insert(tx_id.to_string(), blob);
    }

    pub fn fail_blob(&self, tx_id: &str) {
        self.failing_blobs.write().insert(tx_id.to_string());
    }

    pub fn set_query_failure(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Make every query take `delay` before answering.
    pub fn set_query_delay(&self, delay: Option<Duration>) {
        *self.query_delay.write() = delay;
    }

    /// Make every blob fetch take `delay` before answering.
    pub fn set_blob_delay(&self, delay: Option<Duration>) {
        *self.blob_delay.write() = delay;
    }

    /// Highest number of blob fetches seen running at once.
    pub fn max_blobs_in_flight(&self) -> usize {
        self.max_blobs_in_flight.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    pub fn blob_fetch_count(&self) -> usize {
        self.blob_fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerSource for MockLedger {
    async fn query(&self, query: &TagQuery) -> Result<Vec<LedgerTransaction>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let delay = *self.query_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(NotesError::Status {
                url: format!("{}/graphql", MOCK_GATEWAY),
                status: 502,
            });
        }
        Ok(self
            .transactions
            .read()
            .iter()
            .filter(|tx| query.matches(tx))
            .cloned()
            .collect())
    }

    async fn fetch_blob(&self, tx_id: &str) -> Result<UnifiedAuthorBlob> {
        self.blob_fetch_count.fetch_add(1, Ordering::SeqCst);
        let running = self.blobs_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_blobs_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.blob_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_blobs.read().contains(tx_id);
        let result = if failing {
            Err(NotesError::Status {
                url: self.blob_url(tx_id),
                status: 503,
            })
        } else {
            self.blobs
                .read()
                .get(tx_id)
                .cloned()
                .ok_or_else(|| NotesError::Status {
                    url: self.blob_url(tx_id),
                    status: 404,
                })
        };

        self.blobs_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn blob_url(&self, tx_id: &str) -> String {
        mutable_address(MOCK_GATEWAY, tx_id)
    }

    fn gateway_url(&self) -> &str {
        MOCK_GATEWAY
    }
}
