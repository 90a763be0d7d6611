use std::collections::BTreeSet;

use serde::Serialize;

use super::Note;

/// A subject account a CM wrote about, with the time of the latest such note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUser {
    pub handle: String,
    pub label: String,
    pub timestamp: u64,
}

/// Per-CM (or per-dApp) projection of the reconciled notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CmInfo {
    pub handle: String,
    /// Current display name
    pub name: String,
    pub historical_names: BTreeSet<String>,
    pub note_count: usize,
    pub recent_users: Vec<RecentUser>,
    pub recent_notes: Vec<Note>,
    pub last_activity: Option<u64>,
    pub is_dapp: bool,
}

/// Per-subject projection of the reconciled notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub handle: String,
    /// Subject handle, or the CM's current name when the subject is a CM
    pub label: String,
    pub note_count: usize,
    pub recent_notes: Vec<Note>,
    pub last_activity: u64,
    pub is_cm: bool,
}
