//! Application-wide constants
//!
//! Ledger wire names and the default tuning values used by `CoreConfig`.

/// Default GraphQL query endpoint of the ledger gateway
pub const GRAPHQL_URL: &str = "https://arweave.net/graphql";

/// Default gateway used to resolve per-author mutable blob addresses
pub const GATEWAY_URL: &str = "https://arweave.net";

/// Cache snapshots older than this are stale (5 minutes)
pub const CACHE_TTL_SECS: u64 = 5 * 60;

/// Staleness check cadence of the background refresh timer
pub const REFRESH_INTERVAL_SECS: u64 = 60;

/// Concurrent blob fetches per batch
pub const BLOB_BATCH_SIZE: usize = 15;

/// Pause between blob batches
pub const BLOB_BATCH_DELAY_MS: u64 = 250;

/// Per-request timeout for gateway calls
pub const REQUEST_TIMEOUT_SECS: u64 = 20;

/// GraphQL page size (`first:`)
pub const QUERY_PAGE_SIZE: u32 = 100;

/// Cap for `recent_users` / `recent_notes` in aggregation views
pub const RECENT_LIMIT: usize = 10;

// Record namespaces, carried as the `App-Name` tag value
pub mod app_names {
    /// Per-author consolidated blobs
    pub const UNIFIED: &str = "CMNotes-Unified";
    /// Legacy one-transaction-per-note records
    pub const INDIVIDUAL: &str = "CMNotes-Individual";
    /// CM name -> handle grants
    pub const PERMISSION: &str = "CMNotes-Permission";
}

// Tag names used on ledger transactions
pub mod tags {
    pub const APP_NAME: &str = "App-Name";
    pub const PROJECT: &str = "Project";
    /// Subject account the note is about
    pub const TWITTER_HANDLE: &str = "Twitter-Handle";
    pub const CM_NAME: &str = "CM-Name";
    pub const CM_TWITTER_HANDLE: &str = "CM-Twitter-Handle";
    pub const CONTENT: &str = "Content";
    pub const STATUS: &str = "Status";
    pub const TIMESTAMP: &str = "Timestamp";
    /// Root transaction of an edit/remove chain
    pub const ROOT_TX: &str = "Root-Tx";
    pub const ICON_URL: &str = "Icon-Url";
    pub const SOURCE_URL: &str = "Source-Url";
}
