pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod models;
pub mod runtime;
pub mod stats;
pub mod store;
pub mod tracing_setup;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::CoreConfig;
pub use error::{FailureKind, NotesError};
pub use models::{Note, NoteStatus};
pub use runtime::{CacheRead, NotesRuntime, ProjectData, RefreshOutcome, RefreshTimer};
pub use store::{reconcile, AggregatedViews, IdentityResolver, SnapshotCache};
