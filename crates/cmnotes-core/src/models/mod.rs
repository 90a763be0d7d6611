pub mod identity;
pub mod ledger_tx;
pub mod note;
pub mod permission;
pub mod tag_utils;
pub mod unified;
pub mod views;

pub use identity::CmIdentity;
pub use ledger_tx::{LedgerTransaction, Tag};
pub use note::{normalize_handle, normalize_timestamp, Note, NoteStatus};
pub use permission::PermissionGrant;
pub use unified::{
    UnifiedAuthorBlob, UnifiedCmSection, UnifiedNoteEntry, UnifiedProjectSection, UnifiedRecord,
};
pub use views::{CmInfo, RecentUser, UserInfo};
