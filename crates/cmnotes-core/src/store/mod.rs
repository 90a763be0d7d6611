pub mod identity;
pub mod reconcile;
pub mod snapshot_cache;
pub mod views;

pub use identity::{DappClassifier, IdentityResolver};
pub use reconcile::reconcile;
pub use snapshot_cache::{
    CacheSnapshot, CacheState, Clock, ManualClock, SessionMarker, SnapshotCache, SystemClock,
};
pub use views::{get_notes_for_cm, get_notes_for_user, AggregatedViews};
