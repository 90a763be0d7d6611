//! Handle-keyed CM identities, rebuilt once per project load.

use std::collections::{HashMap, HashSet};

use crate::models::{normalize_handle, CmIdentity, Note};

/// Static classification of handles that belong to dApps rather than people.
#[derive(Debug, Clone, Default)]
pub struct DappClassifier {
    handles: HashSet<String>,
}

impl DappClassifier {
    pub fn new<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            handles: handles
                .into_iter()
                .map(|h| normalize_handle(h.as_ref()))
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn is_dapp(&self, handle: &str) -> bool {
        self.handles.contains(&normalize_handle(handle))
    }
}

/// Maps display names onto stable handles.
///
/// Permission grants seed the identities and fix their current names; notes
/// add aliases, and create identities for CMs that never received a grant.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    identities: HashMap<String, CmIdentity>,
    /// display name -> normalized handle
    name_index: HashMap<String, String>,
    classifier: DappClassifier,
}

impl IdentityResolver {
    /// Build a resolver from `(name, handle)` grants, in the order they were
    /// granted (a later grant for the same handle renames it), and the notes
    /// of one project.
    pub fn initialize<I, N, H>(grants: I, notes: &[Note], classifier: DappClassifier) -> Self
    where
        I: IntoIterator<Item = (N, H)>,
        N: AsRef<str>,
        H: AsRef<str>,
    {
        let mut resolver = Self {
            identities: HashMap::new(),
            name_index: HashMap::new(),
            classifier,
        };

        for (name, handle) in grants {
            resolver.seed_grant(name.as_ref().trim(), &normalize_handle(handle.as_ref()));
        }

        // Newest first, so an ungranted CM's latest name becomes current.
        let mut by_recency: Vec<&Note> = notes.iter().collect();
        by_recency.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

        for note in by_recency.iter().filter(|n| n.author_handle.is_some()) {
            if let Some(handle) = note.author_handle.as_deref() {
                resolver.fold_author(note.author_name.trim(), &normalize_handle(handle));
            }
        }

        // Legacy notes without a handle: attach by name, else key by the name itself.
        for note in by_recency.iter().filter(|n| n.author_handle.is_none()) {
            let name = note.author_name.trim();
            if name.is_empty() || resolver.name_index.contains_key(name) {
                continue;
            }
            let pseudo_handle = normalize_handle(name);
            resolver.fold_author(name, &pseudo_handle);
        }

        tracing::debug!(
            identities = resolver.identities.len(),
            names = resolver.name_index.len(),
            "identity resolver initialized"
        );

        resolver
    }

    fn seed_grant(&mut self, name: &str, handle: &str) {
        if name.is_empty() || handle.is_empty() {
            return;
        }
        let is_dapp = self.classifier.is_dapp(handle);
        let identity = self
            .identities
            .entry(handle.to_string())
            .or_insert_with(|| CmIdentity::new(handle.to_string(), name.to_string(), is_dapp, true));

        if identity.current_name != name {
            let previous = std::mem::replace(&mut identity.current_name, name.to_string());
            identity.historical_names.insert(previous);
        }
        identity.historical_names.remove(name);
        identity.has_grant = true;
        self.name_index.insert(name.to_string(), handle.to_string());
    }

    fn fold_author(&mut self, name: &str, handle: &str) {
        if handle.is_empty() {
            return;
        }
        let is_dapp = self.classifier.is_dapp(handle);
        match self.identities.get_mut(handle) {
            Some(identity) => identity.observe_name(name),
            None => {
                self.identities.insert(
                    handle.to_string(),
                    CmIdentity::new(handle.to_string(), name.to_string(), is_dapp, false),
                );
            }
        }
        if !name.is_empty() {
            self.name_index
                .entry(name.to_string())
                .or_insert_with(|| handle.to_string());
        }
    }

    pub fn handle_for_name(&self, name: &str) -> Option<&str> {
        self.name_index.get(name.trim()).map(String::as_str)
    }

    pub fn current_name_for_handle(&self, handle: &str) -> Option<&str> {
        self.identities
            .get(&normalize_handle(handle))
            .map(|identity| identity.current_name.as_str())
    }

    pub fn is_dapp(&self, handle: &str) -> bool {
        self.classifier.is_dapp(handle)
    }

    pub fn identity(&self, handle: &str) -> Option<&CmIdentity> {
        self.identities.get(&normalize_handle(handle))
    }

    pub fn identities(&self) -> impl Iterator<Item = &CmIdentity> + '_ {
        self.identities.values()
    }

    /// Identity that authored `note`: by its handle when present, else by name.
    pub fn resolve_author(&self, note: &Note) -> Option<&CmIdentity> {
        match note.author_handle.as_deref() {
            Some(handle) => self.identity(handle),
            None => self
                .handle_for_name(&note.author_name)
                .and_then(|handle| self.identities.get(handle)),
        }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::note;

    #[test]
    fn test_grant_name_is_current_and_aliases_are_historical() {
        let notes = vec![
            note("1", "Alice", Some("alice_h"), "x", 10),
            note("2", "Alicia", Some("alice_h"), "y", 20),
        ];
        let resolver =
            IdentityResolver::initialize([("Alice", "@Alice_H")], &notes, DappClassifier::default());

        let identity = resolver.identity("alice_h").unwrap();
        assert_eq!(identity.current_name, "Alice");
        assert!(identity.historical_names.contains("Alicia"));
        assert!(!identity.historical_names.contains("Alice"));
        assert_eq!(resolver.handle_for_name("Alicia"), Some("alice_h"));
        assert_eq!(resolver.current_name_for_handle("@ALICE_H"), Some("Alice"));
    }

    #[test]
    fn test_ungranted_cm_uses_latest_note_name() {
        let notes = vec![
            note("1", "Old Dan", Some("dan"), "x", 10),
            note("2", "Dan", Some("dan"), "x", 30),
        ];
        let resolver = IdentityResolver::initialize(
            Vec::<(String, String)>::new(),
            &notes,
            DappClassifier::default(),
        );
        let identity = resolver.identity("dan").unwrap();
        assert_eq!(identity.current_name, "Dan");
        assert!(identity.historical_names.contains("Old Dan"));
        assert!(!identity.has_grant);
    }

    #[test]
    fn test_later_grant_renames_handle() {
        let resolver = IdentityResolver::initialize(
            [("Bobby", "bob_tw"), ("Bob", "bob_tw")],
            &[],
            DappClassifier::default(),
        );
        let identity = resolver.identity("bob_tw").unwrap();
        assert_eq!(identity.current_name, "Bob");
        assert!(identity.historical_names.contains("Bobby"));
        assert_eq!(resolver.handle_for_name("Bobby"), Some("bob_tw"));
    }

    #[test]
    fn test_handleless_note_resolves_by_name() {
        let notes = vec![
            note("1", "Alice", None, "x", 10),
            note("2", "Legacy", None, "x", 5),
        ];
        let resolver =
            IdentityResolver::initialize([("Alice", "alice_h")], &notes, DappClassifier::default());
        assert_eq!(resolver.resolve_author(&notes[0]).unwrap().handle, "alice_h");
        assert_eq!(resolver.resolve_author(&notes[1]).unwrap().handle, "legacy");
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn test_dapp_classification() {
        let classifier = DappClassifier::new(["@SwapDapp"]);
        let resolver = IdentityResolver::initialize([("Swap", "swapdapp")], &[], classifier);
        assert!(resolver.is_dapp("swapdapp"));
        assert!(resolver.identity("swapdapp").unwrap().is_dapp);
        assert!(!resolver.is_dapp("alice_h"));
    }
}
