//! Tag extraction utilities for parsing ledger transactions
//!
//! Provides helper functions to reduce boilerplate when reading tags off raw records.

use super::LedgerTransaction;

/// Extract a single string value from a tag by name.
/// Returns the first occurrence if multiple tags exist.
pub fn extract_tag_str<'a>(tx: &'a LedgerTransaction, tag_name: &str) -> Option<&'a str> {
    tx.tags
        .iter()
        .find(|tag| tag.name == tag_name)
        .map(|tag| tag.value.as_str())
}

/// Like `extract_tag_str`, but trims the value and treats blank values as absent.
pub fn extract_tag_nonempty<'a>(tx: &'a LedgerTransaction, tag_name: &str) -> Option<&'a str> {
    extract_tag_str(tx, tag_name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;

    fn tx() -> LedgerTransaction {
        LedgerTransaction::new(
            "tx1",
            vec![
                Tag::new("Title", "My Title"),
                Tag::new("Topic", "rust"),
                Tag::new("Topic", "ledger"),
                Tag::new("Blank", "   "),
            ],
            Some(1),
        )
    }

    #[test]
    fn test_extract_tag_str() {
        let tx = tx();
        assert_eq!(extract_tag_str(&tx, "Title"), Some("My Title"));
        assert_eq!(extract_tag_str(&tx, "Topic"), Some("rust"));
        assert_eq!(extract_tag_str(&tx, "nonexistent"), None);
    }

    #[test]
    fn test_extract_tag_nonempty() {
        let tx = tx();
        assert_eq!(extract_tag_nonempty(&tx, "Blank"), None);
        assert_eq!(extract_tag_str(&tx, "Blank"), Some("   "));
    }
}
