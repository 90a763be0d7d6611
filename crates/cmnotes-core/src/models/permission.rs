use super::note::normalize_handle;
use super::tag_utils::extract_tag_nonempty;
use super::LedgerTransaction;
use crate::constants::tags;

/// A CM-name -> handle grant for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    pub project: String,
    pub cm_name: String,
    /// Normalized handle
    pub handle: String,
    pub timestamp: u64,
}

impl PermissionGrant {
    pub fn from_tx(tx: &LedgerTransaction) -> Option<Self> {
        let project = extract_tag_nonempty(tx, tags::PROJECT)?;
        let cm_name = extract_tag_nonempty(tx, tags::CM_NAME)?;
        let handle = normalize_handle(extract_tag_nonempty(tx, tags::CM_TWITTER_HANDLE)?);
        if handle.is_empty() {
            return None;
        }

        let timestamp = extract_tag_nonempty(tx, tags::TIMESTAMP)
            .and_then(|t| t.parse::<u64>().ok())
            .map(super::normalize_timestamp)
            .or(tx.timestamp)
            .unwrap_or(0);

        Some(PermissionGrant {
            project: project.to_string(),
            cm_name: cm_name.to_string(),
            handle,
            timestamp,
        })
    }
}
