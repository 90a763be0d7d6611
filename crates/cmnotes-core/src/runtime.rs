use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::CoreConfig;
use crate::error::{FailureKind, Result};
use crate::ledger::{FetchReport, HttpLedgerClient, LedgerSource, RecordFetcher};
use crate::models::{Note, PermissionGrant};
use crate::stats::{FetchStats, SharedFetchStats};
use crate::store::snapshot_cache::{CacheSnapshot, Clock, SnapshotCache, SystemClock};
use crate::store::{reconcile, AggregatedViews, DappClassifier, IdentityResolver};

/// Everything the presentation layer needs for one project.
#[derive(Debug, Clone)]
pub struct ProjectData {
    pub project: String,
    pub notes: Vec<Note>,
    pub grants: Vec<PermissionGrant>,
    pub resolver: IdentityResolver,
    pub views: AggregatedViews,
    pub report: FetchReport,
}

/// Result of a non-blocking cache read.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: Option<Arc<CacheSnapshot>>,
    /// No snapshot, or one older than the TTL
    pub is_stale: bool,
    /// A background refresh was started by this read
    pub refresh_started: bool,
}

impl CacheRead {
    pub fn data(&self) -> &[Note] {
        self.snapshot
            .as_ref()
            .map(|s| s.data.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published { notes: usize },
    /// Another project was selected while the refresh ran
    Discarded,
    Failed(FailureKind),
}

struct RuntimeInner {
    config: CoreConfig,
    fetcher: RecordFetcher,
    cache: SnapshotCache,
    classifier: DappClassifier,
    selection: Mutex<Option<String>>,
    in_flight: Mutex<HashSet<String>>,
    /// Projects whose previous-session snapshot was already refreshed
    session_refreshed: Mutex<HashSet<String>>,
    stats: SharedFetchStats,
}

impl RuntimeInner {
    async fn query_notes(&self, project: &str) -> Result<(Vec<Note>, FetchReport)> {
        let (unified, individual) = tokio::join!(
            self.fetcher.fetch_unified_records(project),
            self.fetcher.fetch_individual_records(project),
        );

        let outcome = match (unified, individual) {
            (Ok((unified, report)), Ok(individual)) => {
                let notes = reconcile(project, &unified, &individual, self.fetcher.gateway_url());
                Ok((notes, report))
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        self.stats.record_load(outcome.is_ok());
        outcome
    }

    /// A refresh publishes unless a different project is now selected.
    fn is_current(&self, project: &str) -> bool {
        self.selection
            .lock()
            .as_deref()
            .map_or(true, |active| active == project)
    }

    fn spawn_refresh(self: &Arc<Self>, project: &str) -> Option<JoinHandle<RefreshOutcome>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(project, "no async runtime, skipping background refresh");
            return None;
        };

        if !self.in_flight.lock().insert(project.to_string()) {
            tracing::debug!(project, "refresh already in flight");
            return None;
        }

        let inner = Arc::clone(self);
        let project = project.to_string();
        Some(handle.spawn(async move { inner.run_refresh(project).await }))
    }

    async fn run_refresh(&self, project: String) -> RefreshOutcome {
        let outcome = match self.query_notes(&project).await {
            Ok((notes, _)) if self.is_current(&project) => {
                let count = notes.len();
                self.cache.save_to_cache(&project, notes);
                tracing::info!(project = %project, notes = count, "background refresh published");
                RefreshOutcome::Published { notes: count }
            }
            Ok(_) => {
                tracing::debug!(project = %project, "selection changed, discarding refresh");
                RefreshOutcome::Discarded
            }
            Err(e) => {
                tracing::warn!(project = %project, kind = %e.kind(), error = %e, "background refresh failed");
                RefreshOutcome::Failed(e.kind())
            }
        };
        self.in_flight.lock().remove(&project);
        outcome
    }

    fn check_staleness(self: &Arc<Self>) {
        let active = self.selection.lock().clone();
        if let Some(project) = active {
            if !self.cache.is_cache_valid(&project) {
                tracing::debug!(project = %project, "snapshot stale, refreshing");
                self.spawn_refresh(&project);
            }
        }
    }
}

/// Entry point of the note pipeline: fetch, reconcile, aggregate and cache.
#[derive(Clone)]
pub struct NotesRuntime {
    inner: Arc<RuntimeInner>,
}

impl NotesRuntime {
    pub fn new(config: CoreConfig, source: Arc<dyn LedgerSource>) -> Self {
        Self::with_clock(config, source, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CoreConfig, source: Arc<dyn LedgerSource>, clock: Arc<dyn Clock>) -> Self {
        let stats = SharedFetchStats::new();
        let fetcher = RecordFetcher::new(source, &config, stats.clone());
        let cache = SnapshotCache::new(
            config.data_dir.clone(),
            Duration::from_secs(config.cache_ttl_secs),
            clock,
        );
        let classifier = DappClassifier::new(&config.dapp_handles);

        Self {
            inner: Arc::new(RuntimeInner {
                config,
                fetcher,
                cache,
                classifier,
                selection: Mutex::new(None),
                in_flight: Mutex::new(HashSet::new()),
                session_refreshed: Mutex::new(HashSet::new()),
                stats,
            }),
        }
    }

    /// Runtime backed by the configured ledger gateway.
    pub fn http(config: CoreConfig) -> Result<Self> {
        let client = HttpLedgerClient::new(&config)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.inner.cache
    }

    pub fn stats(&self) -> FetchStats {
        self.inner.stats.snapshot()
    }

    /// Fetch both record families and reconcile them. Only a failed project
    /// query is an error; missing author blobs just mean fewer notes.
    pub async fn query_notes_by_project(&self, project: &str) -> Result<Vec<Note>> {
        self.inner.query_notes(project).await.map(|(notes, _)| notes)
    }

    /// Full load: notes, grants, identities and views. The notes are
    /// published to the cache.
    pub async fn load_project(&self, project: &str) -> Result<ProjectData> {
        let (notes, grants) = tokio::join!(
            self.inner.query_notes(project),
            self.inner.fetcher.fetch_permission_grants(project),
        );
        let (notes, report) = notes?;
        let grants = grants.unwrap_or_else(|e| {
            tracing::warn!(project, error = %e, "permission grants unavailable, resolving from notes only");
            Vec::new()
        });

        self.inner.cache.save_to_cache(project, notes.clone());
        Ok(self.build_project_data(project, notes, grants, report))
    }

    /// Derive identities and views for already-reconciled notes.
    pub fn build_project_data(
        &self,
        project: &str,
        notes: Vec<Note>,
        grants: Vec<PermissionGrant>,
        report: FetchReport,
    ) -> ProjectData {
        let resolver = IdentityResolver::initialize(
            grants.iter().map(|g| (g.cm_name.as_str(), g.handle.as_str())),
            &notes,
            self.inner.classifier.clone(),
        );
        let views = AggregatedViews::build(&notes, &resolver, self.inner.config.recent_limit);

        ProjectData {
            project: project.to_string(),
            notes,
            grants,
            resolver,
            views,
            report,
        }
    }

    /// Make `project` the active selection. A background refresh for any
    /// other project will not publish once it finishes.
    pub fn select_project(&self, project: &str) {
        *self.inner.selection.lock() = Some(project.to_string());
    }

    pub fn active_project(&self) -> Option<String> {
        self.inner.selection.lock().clone()
    }

    /// Serve whatever is cached for `project` without waiting on the network.
    ///
    /// A refresh is started in the background when the cache is empty or
    /// stale, or, once per session, when the snapshot was written by an
    /// earlier session.
    pub fn get_or_refresh(&self, project: &str) -> CacheRead {
        let cache = &self.inner.cache;
        let snapshot = cache.load_snapshot(project);
        let (is_stale, needs_refresh) = match &snapshot {
            None => (true, true),
            Some(s) if !cache.is_snapshot_valid(s) => (true, true),
            Some(s) => {
                let first_look = cache.is_from_previous_session(s)
                    && self.inner.session_refreshed.lock().insert(project.to_string());
                (false, first_look)
            }
        };

        let refresh_started = needs_refresh && self.inner.spawn_refresh(project).is_some();

        CacheRead {
            snapshot,
            is_stale,
            refresh_started,
        }
    }

    /// Start a background refresh of `project`, unless one is already running.
    pub fn refresh_in_background(&self, project: &str) -> Option<JoinHandle<RefreshOutcome>> {
        self.inner.spawn_refresh(project)
    }

    pub fn refreshes_in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Refresh and wait. On a failed query, fall back to the last snapshot,
    /// else to no notes.
    pub async fn refresh_now(&self, project: &str) -> Vec<Note> {
        match self.inner.query_notes(project).await {
            Ok((notes, _)) => {
                self.inner.cache.save_to_cache(project, notes.clone());
                notes
            }
            Err(e) => {
                tracing::warn!(project, kind = %e.kind(), error = %e, "refresh failed, serving cached notes");
                self.inner
                    .cache
                    .load_snapshot(project)
                    .map(|s| s.data.clone())
                    .unwrap_or_default()
            }
        }
    }

    /// Periodically refresh the active project when its snapshot goes stale.
    /// The timer stops when the returned guard is stopped or dropped.
    pub fn start_refresh_timer(&self) -> RefreshTimer {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let period = Duration::from_secs(self.inner.config.refresh_interval_secs.max(1));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        inner.check_staleness();
                    }
                }
            }
            tracing::debug!("refresh timer stopped");
        });

        RefreshTimer {
            cancel_tx,
            handle: Some(handle),
        }
    }
}

/// Guard for the staleness timer.
pub struct RefreshTimer {
    cancel_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTimer {
    /// Stop the timer and wait for its task to exit.
    pub async fn stop(mut self) {
        let _ = self.cancel_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
