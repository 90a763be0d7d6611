//! Merge of the unified and individual record families into one note set.
//!
//! Every stored version of a logical note shares a root transaction id. Within
//! a root group the newest version is authoritative; a tombstone there hides
//! the whole group. When the unified family covers a root, individual records
//! for that root are ignored.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::constants::tags;
use crate::models::tag_utils::extract_tag_nonempty;
use crate::models::note::UNMINED_TIMESTAMP;
use crate::models::{LedgerTransaction, Note, NoteStatus, UnifiedRecord};

enum Source {
    Unified,
    Individual,
}

#[derive(Default)]
struct RootGroup {
    unified: Vec<Note>,
    individual: Vec<Note>,
}

/// Reconcile both record families for `project` into the visible notes,
/// newest first. Pure: identical inputs give identical output, whatever the
/// input order.
pub fn reconcile(
    project: &str,
    unified: &[UnifiedRecord],
    individual: &[LedgerTransaction],
    gateway_url: &str,
) -> Vec<Note> {
    let mut candidates: Vec<(Source, Note)> = Vec::new();

    for record in unified {
        let subject = extract_tag_nonempty(&record.tx, tags::TWITTER_HANDLE);
        candidates.extend(
            record
                .blob
                .notes_for_project(project, &record.tx.id, subject, &record.source_url)
                .into_iter()
                .map(|note| (Source::Unified, note)),
        );
    }
    let unified_candidates = candidates.len();

    for tx in individual {
        match Note::from_individual_tx(tx, gateway_url) {
            Some(note) if note.project == project => candidates.push((Source::Individual, note)),
            Some(_) => {}
            None => tracing::debug!(tx_id = %tx.id, "skipping malformed individual note"),
        }
    }
    let individual_candidates = candidates.len() - unified_candidates;

    // Unmined versions are the newest writes we know of.
    let newest_known = candidates
        .iter()
        .map(|(_, note)| note.timestamp)
        .filter(|&ts| ts != UNMINED_TIMESTAMP)
        .max()
        .unwrap_or(0);

    let mut groups: HashMap<String, RootGroup> = HashMap::new();
    for (source, mut note) in candidates {
        if note.is_unmined() {
            note.timestamp = newest_known.saturating_add(1);
        }
        let group = groups.entry(note.root_tx_id.clone()).or_default();
        match source {
            Source::Unified => group.unified.push(note),
            Source::Individual => group.individual.push(note),
        }
    }

    let group_count = groups.len();
    let mut notes: Vec<Note> = groups
        .into_values()
        .filter_map(|group| {
            let pool = if group.unified.is_empty() {
                group.individual
            } else {
                group.unified
            };
            pool.into_iter()
                .max_by(version_order)
                .filter(Note::is_visible)
        })
        .collect();

    notes.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.root_tx_id.cmp(&b.root_tx_id))
    });

    tracing::debug!(
        project,
        unified_candidates,
        individual_candidates,
        groups = group_count,
        visible = notes.len(),
        "reconciled notes"
    );

    notes
}

/// Total order over versions of one root: newer wins; at the same instant a
/// tombstone beats an edit, an edit beats an add; the id breaks what remains.
fn version_order(a: &Note, b: &Note) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then_with(|| status_rank(a.status).cmp(&status_rank(b.status)))
        .then_with(|| a.id.cmp(&b.id))
}

fn status_rank(status: NoteStatus) -> u8 {
    match status {
        NoteStatus::Added => 0,
        NoteStatus::Edited => 1,
        NoteStatus::Removed => 2,
    }
}
