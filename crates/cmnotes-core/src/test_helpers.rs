//! Builders shared by unit tests across modules.

use crate::models::{Note, NoteStatus};

/// A visible, self-rooted note in project `demo`.
pub fn note(id: &str, author: &str, handle: Option<&str>, subject: &str, ts: u64) -> Note {
    Note {
        id: id.to_string(),
        root_tx_id: id.to_string(),
        project: "demo".to_string(),
        subject_handle: subject.to_string(),
        author_name: author.to_string(),
        author_handle: handle.map(str::to_string),
        content: format!("note {}", id),
        status: NoteStatus::Added,
        timestamp: ts,
        icon_url: String::new(),
        source_url: String::new(),
    }
}
