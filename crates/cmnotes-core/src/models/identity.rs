use std::collections::BTreeSet;

/// Stable identity of a CM (or dApp) across display-name changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmIdentity {
    /// Normalized handle; the only stable key
    pub handle: String,
    pub current_name: String,
    /// Names seen on notes that differ from `current_name`
    pub historical_names: BTreeSet<String>,
    pub is_dapp: bool,
    /// Seeded from a permission grant rather than inferred from notes
    pub has_grant: bool,
}

impl CmIdentity {
    pub fn new(handle: String, current_name: String, is_dapp: bool, has_grant: bool) -> Self {
        Self {
            handle,
            current_name,
            historical_names: BTreeSet::new(),
            is_dapp,
            has_grant,
        }
    }

    /// Every name this identity has been known by, current first.
    pub fn all_names(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.current_name.as_str())
            .chain(self.historical_names.iter().map(String::as_str))
    }

    pub(crate) fn observe_name(&mut self, name: &str) {
        if name != self.current_name {
            self.historical_names.insert(name.to_string());
        }
    }
}
