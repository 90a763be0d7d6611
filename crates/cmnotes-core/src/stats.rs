use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Counters for records pulled from the ledger
#[derive(Debug, Default, Clone)]
pub struct FetchStats {
    /// Records returned per namespace (`App-Name` value)
    pub records_by_namespace: HashMap<String, u64>,
    pub blob_attempts: u64,
    pub blob_failures: u64,
    /// Failed blob transaction ids from the most recent unified fetch
    pub last_failed_blobs: Vec<String>,
    pub completed_loads: u64,
    pub failed_loads: u64,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&mut self, namespace: &str, count: usize) {
        *self
            .records_by_namespace
            .entry(namespace.to_string())
            .or_insert(0) += count as u64;
    }

    pub fn record_blobs(&mut self, attempted: usize, failed: &[String]) {
        self.blob_attempts += attempted as u64;
        self.blob_failures += failed.len() as u64;
        self.last_failed_blobs = failed.to_vec();
    }

    pub fn blob_failure_rate(&self) -> f64 {
        if self.blob_attempts == 0 {
            0.0
        } else {
            self.blob_failures as f64 / self.blob_attempts as f64
        }
    }
}

/// Thread-safe wrapper for fetch stats
#[derive(Debug, Clone, Default)]
pub struct SharedFetchStats {
    inner: Arc<RwLock<FetchStats>>,
}

impl SharedFetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self, namespace: &str, count: usize) {
        self.inner.write().record_query(namespace, count);
    }

    pub fn record_blobs(&self, attempted: usize, failed: &[String]) {
        self.inner.write().record_blobs(attempted, failed);
    }

    pub fn record_load(&self, success: bool) {
        let mut stats = self.inner.write();
        if success {
            stats.completed_loads += 1;
        } else {
            stats.failed_loads += 1;
        }
    }

    pub fn snapshot(&self) -> FetchStats {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_stats_accumulate() {
        let stats = SharedFetchStats::new();
        stats.record_query("CMNotes-Unified", 3);
        stats.record_query("CMNotes-Unified", 2);
        stats.record_blobs(5, &["bad".to_string()]);
        stats.record_load(true);
        stats.record_load(false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.records_by_namespace["CMNotes-Unified"], 5);
        assert_eq!(snapshot.blob_failures, 1);
        assert_eq!(snapshot.last_failed_blobs, vec!["bad".to_string()]);
        assert!((snapshot.blob_failure_rate() - 0.2).abs() < f64::EPSILON);
        assert_eq!(snapshot.completed_loads, 1);
        assert_eq!(snapshot.failed_loads, 1);
    }
}
