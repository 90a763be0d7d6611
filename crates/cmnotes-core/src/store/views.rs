use std::collections::HashMap;

use crate::models::{normalize_handle, CmInfo, Note, RecentUser, UserInfo};
use crate::store::identity::IdentityResolver;

/// CM, dApp and subject projections of one project's reconciled notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedViews {
    pub cms: Vec<CmInfo>,
    pub dapps: Vec<CmInfo>,
    pub users: Vec<UserInfo>,
}

impl AggregatedViews {
    /// `notes` are expected newest first, as `reconcile` returns them.
    pub fn build(notes: &[Note], resolver: &IdentityResolver, recent_limit: usize) -> Self {
        let mut notes_by_author: HashMap<&str, Vec<&Note>> = HashMap::new();
        for note in notes {
            match resolver.resolve_author(note) {
                Some(identity) => notes_by_author
                    .entry(identity.handle.as_str())
                    .or_default()
                    .push(note),
                None => tracing::debug!(note_id = %note.id, author = %note.author_name, "note author unresolved"),
            }
        }

        let mut cms = Vec::new();
        let mut dapps = Vec::new();
        for identity in resolver.identities() {
            let mut authored = notes_by_author
                .remove(identity.handle.as_str())
                .unwrap_or_default();
            // Registered-but-inactive CMs stay visible; inferred ones need notes.
            if authored.is_empty() && !identity.has_grant {
                continue;
            }
            sort_by_recency(&mut authored);

            let info = CmInfo {
                handle: identity.handle.clone(),
                name: identity.current_name.clone(),
                historical_names: identity.historical_names.clone(),
                note_count: authored.len(),
                recent_users: recent_users(&authored, resolver, recent_limit),
                recent_notes: authored.iter().take(recent_limit).map(|n| (*n).clone()).collect(),
                last_activity: authored.first().map(|n| n.timestamp),
                is_dapp: identity.is_dapp,
            };
            if info.is_dapp {
                dapps.push(info);
            } else {
                cms.push(info);
            }
        }
        sort_cm_infos(&mut cms);
        sort_cm_infos(&mut dapps);

        let users = build_users(notes, resolver, recent_limit);

        Self { cms, dapps, users }
    }

    pub fn cm(&self, handle: &str) -> Option<&CmInfo> {
        let handle = normalize_handle(handle);
        self.cms
            .iter()
            .chain(self.dapps.iter())
            .find(|info| info.handle == handle)
    }

    pub fn user(&self, handle: &str) -> Option<&UserInfo> {
        let handle = normalize_handle(handle);
        self.users.iter().find(|info| info.handle == handle)
    }
}

/// Display label for a subject: the CM's current name if the subject is a CM.
pub fn user_label(handle: &str, resolver: &IdentityResolver) -> String {
    match resolver.identity(handle) {
        Some(identity) if !identity.is_dapp => identity.current_name.clone(),
        _ => handle.to_string(),
    }
}

fn build_users(notes: &[Note], resolver: &IdentityResolver, recent_limit: usize) -> Vec<UserInfo> {
    let mut notes_by_subject: HashMap<&str, Vec<&Note>> = HashMap::new();
    for note in notes {
        if note.subject_handle.is_empty() || resolver.is_dapp(&note.subject_handle) {
            continue;
        }
        notes_by_subject
            .entry(note.subject_handle.as_str())
            .or_default()
            .push(note);
    }

    let mut users: Vec<UserInfo> = notes_by_subject
        .into_iter()
        .map(|(handle, mut subject_notes)| {
            sort_by_recency(&mut subject_notes);
            let is_cm = resolver
                .identity(handle)
                .map(|identity| !identity.is_dapp)
                .unwrap_or(false);
            UserInfo {
                handle: handle.to_string(),
                label: user_label(handle, resolver),
                note_count: subject_notes.len(),
                recent_notes: subject_notes
                    .iter()
                    .take(recent_limit)
                    .map(|n| (*n).clone())
                    .collect(),
                last_activity: subject_notes.first().map(|n| n.timestamp).unwrap_or(0),
                is_cm,
            }
        })
        .collect();

    users.sort_by(|a, b| {
        b.note_count
            .cmp(&a.note_count)
            .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
            .then_with(|| a.handle.cmp(&b.handle))
    });
    users
}

fn recent_users(authored: &[&Note], resolver: &IdentityResolver, limit: usize) -> Vec<RecentUser> {
    let mut latest: HashMap<&str, u64> = HashMap::new();
    for note in authored {
        let ts = latest.entry(note.subject_handle.as_str()).or_insert(0);
        *ts = (*ts).max(note.timestamp);
    }

    let mut users: Vec<RecentUser> = latest
        .into_iter()
        .map(|(handle, timestamp)| RecentUser {
            handle: handle.to_string(),
            label: user_label(handle, resolver),
            timestamp,
        })
        .collect();
    users.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.handle.cmp(&b.handle)));
    users.truncate(limit);
    users
}

fn sort_by_recency(notes: &mut [&Note]) {
    notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

fn sort_cm_infos(infos: &mut [CmInfo]) {
    infos.sort_by(|a, b| {
        b.note_count
            .cmp(&a.note_count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.handle.cmp(&b.handle))
    });
}

/// Notes about `handle`, newest first.
pub fn get_notes_for_user<'a>(notes: &'a [Note], handle: &str) -> Vec<&'a Note> {
    let handle = normalize_handle(handle);
    notes.iter().filter(|n| n.subject_handle == handle).collect()
}

/// Notes written by the CM behind `handle` under any of its names, newest first.
pub fn get_notes_for_cm<'a>(
    notes: &'a [Note],
    resolver: &IdentityResolver,
    handle: &str,
) -> Vec<&'a Note> {
    let handle = normalize_handle(handle);
    notes
        .iter()
        .filter(|n| {
            resolver
                .resolve_author(n)
                .map(|identity| identity.handle == handle)
                .unwrap_or(false)
        })
        .collect()
}
