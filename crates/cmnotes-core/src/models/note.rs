use serde::{Deserialize, Serialize};

use super::tag_utils::{extract_tag_nonempty, extract_tag_str};
use super::LedgerTransaction;
use crate::constants::tags;

/// Placeholder timestamp for an unmined record with no `Timestamp` tag.
/// `reconcile` replaces it with one just past the newest known version.
pub const UNMINED_TIMESTAMP: u64 = u64::MAX;

/// Lifecycle marker carried by every stored version of a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    #[default]
    Added,
    Edited,
    #[serde(alias = "deleted")]
    Removed,
}

impl NoteStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "added" | "" => Some(NoteStatus::Added),
            "edited" => Some(NoteStatus::Edited),
            "removed" | "deleted" => Some(NoteStatus::Removed),
            _ => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, NoteStatus::Removed)
    }
}

/// A CM-authored note about a social-media account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    /// Groups every stored version (add/edit/remove) of one logical note
    pub root_tx_id: String,
    pub project: String,
    /// Normalized handle of the account the note is about
    pub subject_handle: String,
    pub author_name: String,
    /// Normalized handle of the authoring CM, when the record carries one
    pub author_handle: Option<String>,
    pub content: String,
    pub status: NoteStatus,
    /// Unix seconds
    pub timestamp: u64,
    pub icon_url: String,
    pub source_url: String,
}

impl Note {
    /// Parse a note from a legacy one-transaction-per-note record.
    ///
    /// A transaction without a `Root-Tx` tag is its own root.
    pub fn from_individual_tx(tx: &LedgerTransaction, gateway_url: &str) -> Option<Self> {
        let project = extract_tag_nonempty(tx, tags::PROJECT)?;
        let subject = extract_tag_nonempty(tx, tags::TWITTER_HANDLE)?;
        let author_name = extract_tag_nonempty(tx, tags::CM_NAME)?;

        let status = match extract_tag_str(tx, tags::STATUS) {
            Some(raw) => NoteStatus::parse(raw)?,
            None => NoteStatus::Added,
        };

        let timestamp = extract_tag_nonempty(tx, tags::TIMESTAMP)
            .and_then(|t| t.parse::<u64>().ok())
            .map(normalize_timestamp)
            .or(tx.timestamp)
            .unwrap_or(UNMINED_TIMESTAMP);

        let root_tx_id = extract_tag_nonempty(tx, tags::ROOT_TX)
            .unwrap_or(tx.id.as_str())
            .to_string();

        let source_url = extract_tag_nonempty(tx, tags::SOURCE_URL)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", gateway_url.trim_end_matches('/'), tx.id));

        Some(Note {
            id: tx.id.clone(),
            root_tx_id,
            project: project.to_string(),
            subject_handle: normalize_handle(subject),
            author_name: author_name.to_string(),
            author_handle: extract_tag_nonempty(tx, tags::CM_TWITTER_HANDLE)
                .map(normalize_handle)
                .filter(|h| !h.is_empty()),
            content: extract_tag_str(tx, tags::CONTENT).unwrap_or_default().to_string(),
            status,
            timestamp,
            icon_url: extract_tag_str(tx, tags::ICON_URL)
                .unwrap_or_default()
                .to_string(),
            source_url,
        })
    }

    pub fn is_unmined(&self) -> bool {
        self.timestamp == UNMINED_TIMESTAMP
    }

    pub fn is_visible(&self) -> bool {
        !self.status.is_tombstone()
    }
}

/// Canonical form of a social handle: trimmed, leading `@`s stripped, lowercased.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').trim().to_lowercase()
}

/// Some writers store milliseconds; anything past year ~33658 in seconds is
/// taken to be milliseconds.
pub fn normalize_timestamp(raw: u64) -> u64 {
    if raw > 999_999_999_999 {
        raw / 1000
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;

    fn individual(id: &str, extra: Vec<Tag>) -> LedgerTransaction {
        let mut tags = vec![
            Tag::new(tags::PROJECT, "demo"),
            Tag::new(tags::TWITTER_HANDLE, "@Carol_TW"),
            Tag::new(tags::CM_NAME, "Bob"),
            Tag::new(tags::CONTENT, "hello"),
        ];
        tags.extend(extra);
        LedgerTransaction::new(id, tags, Some(50))
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("@Alice_H"), "alice_h");
        assert_eq!(normalize_handle("  @@bob "), "bob");
        assert_eq!(normalize_handle("carol"), "carol");
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(normalize_timestamp(1_700_000_000), 1_700_000_000);
        assert_eq!(normalize_timestamp(1_700_000_000_123), 1_700_000_000);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(NoteStatus::parse("Removed"), Some(NoteStatus::Removed));
        assert_eq!(NoteStatus::parse("deleted"), Some(NoteStatus::Removed));
        assert_eq!(NoteStatus::parse("edited"), Some(NoteStatus::Edited));
        assert_eq!(NoteStatus::parse("archived"), None);
    }

    #[test]
    fn test_self_rooted_individual_note() {
        let note = Note::from_individual_tx(&individual("tx1", vec![]), "https://gw.test/").unwrap();
        assert_eq!(note.root_tx_id, "tx1");
        assert_eq!(note.subject_handle, "carol_tw");
        assert_eq!(note.status, NoteStatus::Added);
        assert_eq!(note.timestamp, 50);
        assert_eq!(note.source_url, "https://gw.test/tx1");
        assert!(note.author_handle.is_none());
    }

    #[test]
    fn test_individual_note_with_root_and_timestamp_tags() {
        let tx = individual(
            "tx2",
            vec![
                Tag::new(tags::ROOT_TX, "tx1"),
                Tag::new(tags::STATUS, "edited"),
                Tag::new(tags::TIMESTAMP, "1700000000500"),
                Tag::new(tags::CM_TWITTER_HANDLE, "@Bob_TW"),
            ],
        );
        let note = Note::from_individual_tx(&tx, "https://gw.test").unwrap();
        assert_eq!(note.root_tx_id, "tx1");
        assert_eq!(note.status, NoteStatus::Edited);
        assert_eq!(note.timestamp, 1_700_000_000);
        assert_eq!(note.author_handle.as_deref(), Some("bob_tw"));
    }

    #[test]
    fn test_unmined_individual_note_without_timestamp() {
        let mut tx = individual("tx5", vec![Tag::new(tags::STATUS, "removed")]);
        tx.timestamp = None;
        let note = Note::from_individual_tx(&tx, "https://gw.test").unwrap();
        assert!(note.is_unmined());
        assert!(!note.is_visible());
    }

    #[test]
    fn test_individual_note_rejects_unknown_status() {
        let tx = individual("tx3", vec![Tag::new(tags::STATUS, "archived")]);
        assert!(Note::from_individual_tx(&tx, "https://gw.test").is_none());
    }

    #[test]
    fn test_individual_note_requires_subject() {
        let tx = LedgerTransaction::new(
            "tx4",
            vec![Tag::new(tags::PROJECT, "demo"), Tag::new(tags::CM_NAME, "Bob")],
            Some(1),
        );
        assert!(Note::from_individual_tx(&tx, "https://gw.test").is_none());
    }
}
