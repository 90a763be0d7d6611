use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::note::{normalize_handle, normalize_timestamp, Note, NoteStatus};
use super::LedgerTransaction;

/// A unified-namespace transaction paired with the blob fetched from its
/// mutable address.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedRecord {
    pub tx: LedgerTransaction,
    pub blob: UnifiedAuthorBlob,
    /// Address the blob was fetched from
    pub source_url: String,
}

/// Per-author consolidated document living at a mutable address.
///
/// ```json
/// { "version": 2, "updatedAt": 1700000000,
///   "projects": { "<project>": { "cms": { "<cmName>": { "notes": [ ... ] } } } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedAuthorBlob {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub updated_at: u64,
    /// Subject handle, for blobs whose transaction lacks a `Twitter-Handle` tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    #[serde(default)]
    pub projects: BTreeMap<String, UnifiedProjectSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedProjectSection {
    #[serde(default)]
    pub cms: BTreeMap<String, UnifiedCmSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedCmSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cm_twitter_handle: Option<String>,
    #[serde(default)]
    pub notes: Vec<UnifiedNoteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedNoteEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_tx_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: NoteStatus,
    pub timestamp: u64,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub updated_at: u64,
}

impl UnifiedAuthorBlob {
    /// Expand the notes filed under `project` into candidate notes.
    ///
    /// Entries inherit the blob transaction as their base root: an entry's own
    /// `rootTxId` wins, otherwise the root is `<blob_tx_id>:<entry id>` (or the
    /// bare blob id when the entry has no id).
    pub fn notes_for_project(
        &self,
        project: &str,
        blob_tx_id: &str,
        subject_handle: Option<&str>,
        source_url: &str,
    ) -> Vec<Note> {
        let Some(section) = self.projects.get(project) else {
            return Vec::new();
        };

        let subject = subject_handle
            .or(self.twitter_handle.as_deref())
            .map(normalize_handle)
            .unwrap_or_default();
        if subject.is_empty() {
            return Vec::new();
        }

        let mut notes = Vec::new();
        for (cm_name, cm) in &section.cms {
            let author_name = cm_name.trim();
            if author_name.is_empty() {
                continue;
            }
            let author_handle = cm
                .cm_twitter_handle
                .as_deref()
                .map(normalize_handle)
                .filter(|h| !h.is_empty());

            for entry in &cm.notes {
                let root_tx_id = match entry.root_tx_id.as_deref().map(str::trim) {
                    Some(root) if !root.is_empty() => root.to_string(),
                    _ if entry.id.is_empty() => blob_tx_id.to_string(),
                    _ => format!("{}:{}", blob_tx_id, entry.id),
                };
                let id = if entry.id.is_empty() {
                    root_tx_id.clone()
                } else {
                    entry.id.clone()
                };

                notes.push(Note {
                    id,
                    root_tx_id,
                    project: project.to_string(),
                    subject_handle: subject.clone(),
                    author_name: author_name.to_string(),
                    author_handle: author_handle.clone(),
                    content: entry.content.clone(),
                    status: entry.status,
                    timestamp: normalize_timestamp(entry.timestamp),
                    icon_url: entry.icon_url.clone(),
                    source_url: source_url.to_string(),
                });
            }
        }
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = r#"{
        "version": 2,
        "updatedAt": 1700000000,
        "projects": {
            "demo": {
                "cms": {
                    "Bob": {
                        "cmTwitterHandle": "@Bob_TW",
                        "notes": [
                            { "id": "n1", "rootTxId": "root-1", "content": "hi", "status": "added", "timestamp": 100 },
                            { "id": "n2", "content": "second", "status": "edited", "timestamp": 1700000000000 }
                        ]
                    }
                }
            },
            "other": { "cms": { "Eve": { "notes": [ { "id": "x", "timestamp": 1 } ] } } }
        }
    }"#;

    #[test]
    fn test_parse_blob() {
        let blob: UnifiedAuthorBlob = serde_json::from_str(BLOB).unwrap();
        assert_eq!(blob.version, 2);
        assert_eq!(blob.projects.len(), 2);
        let eve = &blob.projects["other"].cms["Eve"].notes[0];
        assert_eq!(eve.status, NoteStatus::Added);
        assert!(eve.content.is_empty());
        assert_eq!(UnifiedNoteEntry::default().status, NoteStatus::Added);
    }

    #[test]
    fn test_notes_for_project() {
        let blob: UnifiedAuthorBlob = serde_json::from_str(BLOB).unwrap();
        let notes = blob.notes_for_project("demo", "blobtx", Some("@Carol_TW"), "https://gw/blobtx");
        assert_eq!(notes.len(), 2);

        let first = notes.iter().find(|n| n.id == "n1").unwrap();
        assert_eq!(first.root_tx_id, "root-1");
        assert_eq!(first.subject_handle, "carol_tw");
        assert_eq!(first.author_name, "Bob");
        assert_eq!(first.author_handle.as_deref(), Some("bob_tw"));

        let second = notes.iter().find(|n| n.id == "n2").unwrap();
        assert_eq!(second.root_tx_id, "blobtx:n2");
        assert_eq!(second.timestamp, 1_700_000_000);
        assert_eq!(second.status, NoteStatus::Edited);
    }

    #[test]
    fn test_notes_for_missing_project_or_subject() {
        let blob: UnifiedAuthorBlob = serde_json::from_str(BLOB).unwrap();
        assert!(blob.notes_for_project("absent", "blobtx", Some("carol"), "u").is_empty());
        assert!(blob.notes_for_project("demo", "blobtx", None, "u").is_empty());
    }
}
