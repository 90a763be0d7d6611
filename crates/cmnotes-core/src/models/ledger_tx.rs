use serde::{Deserialize, Serialize};

/// A single `name: value` tag on a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Raw, unvalidated transaction as returned by a tag-filtered query
/// (`edges[].node`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
    pub tags: Vec<Tag>,
    /// Unix seconds; absent for transactions not yet mined
    pub timestamp: Option<u64>,
}

impl LedgerTransaction {
    pub fn new(id: impl Into<String>, tags: Vec<Tag>, timestamp: Option<u64>) -> Self {
        Self {
            id: id.into(),
            tags,
            timestamp,
        }
    }
}
