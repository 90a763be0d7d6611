use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::{LedgerSource, TagQuery};
use crate::config::{AppNames, CoreConfig};
use crate::constants::tags;
use crate::error::{NotesError, Result};
use crate::models::tag_utils::extract_tag_nonempty;
use crate::models::{normalize_handle, LedgerTransaction, PermissionGrant, UnifiedRecord};
use crate::stats::SharedFetchStats;

/// Outcome of a unified fetch: which blobs were attempted and which failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub attempted: usize,
    pub failed: Vec<String>,
}

impl FetchReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    /// `PartialData` when some blobs failed.
    pub fn as_error(&self) -> Option<NotesError> {
        self.is_partial().then(|| NotesError::PartialData {
            failed: self.failed.len(),
            total: self.attempted,
        })
    }
}

/// Pulls the three record families for one project.
#[derive(Clone)]
pub struct RecordFetcher {
    source: Arc<dyn LedgerSource>,
    app_names: AppNames,
    batch_size: usize,
    batch_delay: Duration,
    stats: SharedFetchStats,
}

impl RecordFetcher {
    pub fn new(source: Arc<dyn LedgerSource>, config: &CoreConfig, stats: SharedFetchStats) -> Self {
        Self {
            source,
            app_names: config.app_names.clone(),
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            stats,
        }
    }

    pub fn gateway_url(&self) -> &str {
        self.source.gateway_url()
    }

    /// Unified records for `project`. Only the query failing is an error;
    /// a blob that cannot be fetched is left out and reported.
    pub async fn fetch_unified_records(
        &self,
        project: &str,
    ) -> Result<(Vec<UnifiedRecord>, FetchReport)> {
        let query = TagQuery::new().tag(tags::APP_NAME, &self.app_names.unified);
        let transactions = self.source.query(&query).await?;
        self.stats
            .record_query(&self.app_names.unified, transactions.len());

        let latest = latest_per_author(transactions);
        let mut records = Vec::with_capacity(latest.len());
        let mut report = FetchReport {
            attempted: latest.len(),
            failed: Vec::new(),
        };

        let batch_count = latest.len().div_ceil(self.batch_size);
        for (batch_index, batch) in latest.chunks(self.batch_size).enumerate() {
            let results = join_all(batch.iter().map(|tx| self.source.fetch_blob(&tx.id))).await;

            for (tx, result) in batch.iter().zip(results) {
                match result {
                    Ok(blob) => records.push(UnifiedRecord {
                        source_url: self.source.blob_url(&tx.id),
                        tx: tx.clone(),
                        blob,
                    }),
                    Err(e) => {
                        tracing::warn!(
                            project,
                            tx_id = %tx.id,
                            kind = %e.kind(),
                            error = %e,
                            "skipping author blob"
                        );
                        report.failed.push(tx.id.clone());
                    }
                }
            }

            if batch_index + 1 < batch_count && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        self.stats.record_blobs(report.attempted, &report.failed);
        if let Some(partial) = report.as_error() {
            tracing::warn!(project, error = %partial, "unified fetch incomplete");
        }

        Ok((records, report))
    }

    /// Legacy one-transaction-per-note records for `project`.
    pub async fn fetch_individual_records(&self, project: &str) -> Result<Vec<LedgerTransaction>> {
        let query = TagQuery::new()
            .tag(tags::APP_NAME, &self.app_names.individual)
            .tag(tags::PROJECT, project);
        let transactions = self.source.query(&query).await?;
        self.stats
            .record_query(&self.app_names.individual, transactions.len());
        Ok(transactions)
    }

    /// Permission grants for `project`, oldest first, one per CM name.
    pub async fn fetch_permission_grants(&self, project: &str) -> Result<Vec<PermissionGrant>> {
        let query = TagQuery::new()
            .tag(tags::APP_NAME, &self.app_names.permission)
            .tag(tags::PROJECT, project);
        let transactions = self.source.query(&query).await?;
        self.stats
            .record_query(&self.app_names.permission, transactions.len());

        let mut latest: HashMap<String, PermissionGrant> = HashMap::new();
        for grant in transactions.iter().filter_map(PermissionGrant::from_tx) {
            if grant.project != project {
                continue;
            }
            match latest.get(&grant.cm_name) {
                Some(existing) if existing.timestamp > grant.timestamp => {}
                _ => {
                    latest.insert(grant.cm_name.clone(), grant);
                }
            }
        }

        let mut grants: Vec<PermissionGrant> = latest.into_values().collect();
        grants.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.cm_name.cmp(&b.cm_name))
        });
        Ok(grants)
    }
}

/// Keep the newest unified transaction per subject; older ones point at
/// superseded versions of the same mutable blob. Unmined transactions count
/// as newest.
fn latest_per_author(transactions: Vec<LedgerTransaction>) -> Vec<LedgerTransaction> {
    let mut latest: HashMap<String, LedgerTransaction> = HashMap::new();
    for tx in transactions {
        let key = extract_tag_nonempty(&tx, tags::TWITTER_HANDLE)
            .map(normalize_handle)
            .unwrap_or_else(|| tx.id.clone());
        let rank = |t: &LedgerTransaction| (t.timestamp.unwrap_or(u64::MAX), t.id.clone());
        match latest.get(&key) {
            Some(existing) if rank(existing) >= rank(&tx) => {}
            _ => {
                latest.insert(key, tx);
            }
        }
    }

    let mut kept: Vec<LedgerTransaction> = latest.into_values().collect();
    kept.sort_by(|a, b| a.id.cmp(&b.id));
    kept
}
