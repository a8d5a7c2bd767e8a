//! Keyword heuristics that pick a type-specific schema before extraction.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::prompt::SchemaKind;

lazy_static! {
    static ref INVOICE_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(?:invoice|inv\s*(?:no|#)|tax\s+invoice|bill\s+to|amount\s+due|balance\s+due|faktura)\b"
    ).unwrap();

    static ref PACKING_LIST_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(?:packing\s+list|packing\s+slip|delivery\s+note|gross\s+weight|net\s+weight|cartons?|consignee)\b"
    ).unwrap();
}

/// Classifies OCR text by keywords.
///
/// Invoice keywords are checked before packing-list keywords and the first
/// match wins; no match selects the combined schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> SchemaKind {
        let kind = if INVOICE_KEYWORDS.is_match(text) {
            SchemaKind::Invoice
        } else if PACKING_LIST_KEYWORDS.is_match(text) {
            SchemaKind::PackingList
        } else {
            SchemaKind::Combined
        };
        debug!("Keyword classification: {:?}", kind);
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_keywords() {
        let c = KeywordClassifier::new();
        assert_eq!(c.classify("INVOICE #123, Vendor: Acme"), SchemaKind::Invoice);
        assert_eq!(c.classify("Bill To: Globex\nAmount Due $50"), SchemaKind::Invoice);
    }

    #[test]
    fn test_packing_list_keywords() {
        let c = KeywordClassifier::new();
        assert_eq!(c.classify("PACKING LIST\n12 cartons"), SchemaKind::PackingList);
        assert_eq!(c.classify("Consignee: Initech"), SchemaKind::PackingList);
    }

    #[test]
    fn test_invoice_checked_first() {
        let c = KeywordClassifier::new();
        assert_eq!(
            c.classify("Packing list attached to invoice 77"),
            SchemaKind::Invoice
        );
    }

    #[test]
    fn test_no_match_is_combined() {
        assert_eq!(
            KeywordClassifier::new().classify("Meeting notes, Tuesday"),
            SchemaKind::Combined
        );
    }
}
