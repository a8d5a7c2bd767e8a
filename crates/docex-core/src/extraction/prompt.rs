//! Prompt construction for the classification + extraction call.

use crate::models::record::DocumentType;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a document data extraction engine. \
You read OCR text from scanned business documents and reply with exactly one JSON object \
and nothing else. Copy values as they appear in the text; never invent values.";

const INVOICE_FIELDS: &[&str] = &[
    "vendor_name",
    "vendor_address",
    "invoice_number",
    "invoice_date",
    "due_date",
    "customer_name",
    "currency",
    "subtotal",
    "tax",
    "total_amount",
];

const PACKING_LIST_FIELDS: &[&str] = &[
    "shipper_name",
    "consignee_name",
    "packing_list_number",
    "order_number",
    "ship_date",
    "carrier",
    "total_packages",
    "total_weight",
];

const OUTPUT_SHAPE: &str = r#"{
  "document_type": "Invoice" | "PackingList" | "Unknown",
  "metadata": { "<field_name>": "<value>" },
  "line_items": [
    {"description": "<text>", "quantity": <number or text>, "unit_price": <number or text>, "total": <number or text>}
  ]
}"#;

/// Which field list the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Let the model classify; list the fields of every type.
    Combined,
    /// The document is known to be an invoice.
    Invoice,
    /// The document is known to be a packing list.
    PackingList,
}

impl SchemaKind {
    /// The type this schema presupposes, if any.
    pub fn document_type(&self) -> Option<DocumentType> {
        match self {
            SchemaKind::Combined => None,
            SchemaKind::Invoice => Some(DocumentType::Invoice),
            SchemaKind::PackingList => Some(DocumentType::PackingList),
        }
    }
}

/// A system instruction plus the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Builds extraction prompts from OCR text.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_chars: usize,
    system: String,
}

impl PromptBuilder {
    /// Keep at most `max_chars` characters of document text.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replace the built-in system instruction.
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Build the prompt for `text` under the given schema.
    pub fn build(&self, text: &str, schema: SchemaKind) -> Prompt {
        let mut user = String::new();

        match schema {
            SchemaKind::Combined => {
                user.push_str("Classify the document and extract its fields.\n\n");
                user.push_str(
                    "1. document_type: exactly one of \"Invoice\", \"PackingList\", \"Unknown\". \
                     Use \"Unknown\" when the document is neither.\n",
                );
                user.push_str("2. metadata: the fields present in the document.\n");
                user.push_str(&format!("   For an Invoice: {}.\n", INVOICE_FIELDS.join(", ")));
                user.push_str(&format!(
                    "   For a PackingList: {}.\n",
                    PACKING_LIST_FIELDS.join(", ")
                ));
                user.push_str("   For Unknown: any clearly labelled fields.\n");
            }
            SchemaKind::Invoice => {
                user.push_str("The document is an invoice. Set document_type to \"Invoice\".\n\n");
                user.push_str(&format!(
                    "1. metadata: the fields present among: {}.\n",
                    INVOICE_FIELDS.join(", ")
                ));
            }
            SchemaKind::PackingList => {
                user.push_str(
                    "The document is a packing list. Set document_type to \"PackingList\".\n\n",
                );
                user.push_str(&format!(
                    "1. metadata: the fields present among: {}.\n",
                    PACKING_LIST_FIELDS.join(", ")
                ));
            }
        }

        user.push_str("   Omit fields that are not in the text.\n");
        let line_items_step = match schema {
            SchemaKind::Combined => 3,
            SchemaKind::Invoice | SchemaKind::PackingList => 2,
        };
        user.push_str(&format!(
            "{}. line_items: one entry per item row; [] when there are none.\n\n",
            line_items_step
        ));
        user.push_str("Respond with one JSON object of exactly this shape:\n");
        user.push_str(OUTPUT_SHAPE);
        user.push_str("\n\nOCR text:\n\"\"\"\n");
        user.push_str(truncate_chars(text, self.max_chars));
        user.push_str("\n\"\"\"\n");

        Prompt {
            system: self.system.clone(),
            user,
        }
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_prefix() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("zażółć", 4), "zażó");
        assert_eq!(truncate_chars("€€€", 2), "€€");
    }

    #[test]
    fn test_combined_prompt_contents() {
        let prompt =
            PromptBuilder::new(2500).build("INVOICE #123, Vendor: Acme", SchemaKind::Combined);

        assert!(prompt.system.contains("exactly one JSON object"));
        assert!(prompt.user.contains("\"Invoice\", \"PackingList\", \"Unknown\""));
        assert!(prompt.user.contains("invoice_number"));
        assert!(prompt.user.contains("packing_list_number"));
        assert!(prompt.user.contains(OUTPUT_SHAPE));
        assert!(prompt.user.contains("INVOICE #123, Vendor: Acme"));
    }

    #[test]
    fn test_type_specific_prompt() {
        let prompt = PromptBuilder::new(2500).build("text", SchemaKind::PackingList);
        assert!(prompt.user.contains("Set document_type to \"PackingList\""));
        assert!(prompt.user.contains("total_weight"));
        assert!(!prompt.user.contains("invoice_number"));
    }

    #[test]
    fn test_steps_are_numbered_consecutively() {
        let builder = PromptBuilder::new(2500);

        let combined = builder.build("text", SchemaKind::Combined).user;
        assert!(combined.contains("1. document_type:"));
        assert!(combined.contains("2. metadata:"));
        assert!(combined.contains("3. line_items:"));

        for schema in [SchemaKind::Invoice, SchemaKind::PackingList] {
            let user = builder.build("text", schema).user;
            assert!(user.contains("1. metadata:"));
            assert!(user.contains("2. line_items:"));
            assert!(!user.contains("3. "));
        }
    }

    #[test]
    fn test_prompt_is_deterministic_and_bounded() {
        let builder = PromptBuilder::new(5);
        let a = builder.build("0123456789", SchemaKind::Combined);
        let b = builder.build("0123456789", SchemaKind::Combined);
        assert_eq!(a, b);
        assert!(a.user.contains("\"\"\"\n01234\n\"\"\""));
        assert!(!a.user.contains("56789"));
    }

    #[test]
    fn test_system_prompt_override() {
        let prompt = PromptBuilder::new(10)
            .with_system_prompt("custom")
            .build("x", SchemaKind::Invoice);
        assert_eq!(prompt.system, "custom");
    }
}
