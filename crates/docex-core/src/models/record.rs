//! Extraction record produced from a model response.
//!
//! The model is asked for one JSON object of the shape
//! `{document_type, metadata, line_items}` but compliance is not guaranteed.
//! [`ExtractionRecord::from_value`] is the only place that tolerates drift:
//! unrecognized fields are ignored and missing ones are defaulted.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::amount::parse_amount;
use crate::error::ParseError;

/// Closed set of document classifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Invoice,
    PackingList,
    #[default]
    Unknown,
}

impl DocumentType {
    /// Map a free-form label to a document type; anything unrecognized is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "invoice" | "taxinvoice" | "commercialinvoice" => DocumentType::Invoice,
            "packinglist" | "packingslip" => DocumentType::PackingList,
            _ => DocumentType::Unknown,
        }
    }

    /// Label used in prompts, JSON and spreadsheets.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "Invoice",
            DocumentType::PackingList => "PackingList",
            DocumentType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item value that is numeric when the model produced a number, text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(Number),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value; `null` and blank strings are absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Scalar::Text(trimmed.to_string()))
                }
            }
            Value::Bool(b) => Some(Scalar::Text(b.to_string())),
            other => Some(Scalar::Text(other.to_string())),
        }
    }

    /// Numeric interpretation, if the value parses as an amount.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Number(n) => parse_amount(&n.to_string())
                .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
            Scalar::Text(s) => parse_amount(s),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// One row of the document's item table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product/service description.
    pub description: String,

    /// Quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Scalar>,

    /// Unit price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Scalar>,

    /// Line total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Scalar>,
}

impl LineItem {
    /// Spreadsheet column names, in order.
    pub const COLUMNS: [&'static str; 4] = ["description", "quantity", "unit_price", "total"];

    fn from_object(obj: &Map<String, Value>) -> Self {
        let pick = |keys: &[&str]| -> Option<Scalar> {
            keys.iter()
                .find_map(|k| obj.get(*k))
                .and_then(Scalar::from_value)
        };

        let description = match obj.get("description").or_else(|| obj.get("item")) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => Scalar::from_value(other)
                .map(|s| s.to_string())
                .unwrap_or_default(),
        };

        Self {
            description,
            quantity: pick(&["quantity", "qty"]),
            unit_price: pick(&["unit_price", "price"]),
            total: pick(&["total", "amount"]),
        }
    }

    /// The optional numeric-or-text cells, in column order after `description`.
    pub fn values(&self) -> [Option<&Scalar>; 3] {
        [
            self.quantity.as_ref(),
            self.unit_price.as_ref(),
            self.total.as_ref(),
        ]
    }
}

/// Parsed and normalized result for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Classification.
    pub document_type: DocumentType,

    /// Sparse field name to value mapping, in the order the model produced it.
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Always present, possibly empty.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl ExtractionRecord {
    /// Normalize a decoded JSON payload into a record.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let Value::Object(mut obj) = value else {
            return Err(ParseError::NotAnObject);
        };

        let document_type = obj
            .get("document_type")
            .or_else(|| obj.get("type"))
            .and_then(Value::as_str)
            .map(DocumentType::from_label)
            .unwrap_or_default();

        let metadata = match obj.remove("metadata") {
            Some(Value::Object(fields)) => fields
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect(),
            _ => Map::new(),
        };

        let line_items = match obj.get("line_items") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(LineItem::from_object)
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            document_type,
            metadata,
            line_items,
        })
    }

    /// Count of populated metadata fields plus line items.
    pub fn score(&self) -> usize {
        let fields = self
            .metadata
            .values()
            .filter(|v| match v {
                Value::String(s) => !s.trim().is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                _ => true,
            })
            .count();
        fields + self.line_items.len()
    }

    /// Serialize with 4-space indentation.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_document_type_labels() {
        assert_eq!(DocumentType::from_label("Invoice"), DocumentType::Invoice);
        assert_eq!(DocumentType::from_label("INVOICE"), DocumentType::Invoice);
        assert_eq!(DocumentType::from_label("PackingList"), DocumentType::PackingList);
        assert_eq!(DocumentType::from_label("packing list"), DocumentType::PackingList);
        assert_eq!(DocumentType::from_label("packing_list"), DocumentType::PackingList);
        assert_eq!(DocumentType::from_label("Receipt"), DocumentType::Unknown);
        assert_eq!(DocumentType::from_label(""), DocumentType::Unknown);
    }

    #[test]
    fn test_from_value_full_shape() {
        let record = ExtractionRecord::from_value(json!({
            "document_type": "Invoice",
            "metadata": {"vendor_name": "Acme", "invoice_number": "123"},
            "line_items": [
                {"description": "Widget", "quantity": 2, "unit_price": "$25.00", "total": 50}
            ]
        }))
        .unwrap();

        assert_eq!(record.document_type, DocumentType::Invoice);
        assert_eq!(record.metadata["vendor_name"], json!("Acme"));
        assert_eq!(
            record.line_items,
            vec![LineItem {
                description: "Widget".to_string(),
                quantity: Some(Scalar::Number(2.into())),
                unit_price: Some(Scalar::Text("$25.00".to_string())),
                total: Some(Scalar::Number(50.into())),
            }]
        );
    }

    #[test]
    fn test_missing_sections_default() {
        let record = ExtractionRecord::from_value(json!({"document_type": "PackingList"})).unwrap();
        assert_eq!(record.document_type, DocumentType::PackingList);
        assert!(record.metadata.is_empty());
        assert!(record.line_items.is_empty());
    }

    #[test]
    fn test_unrecognized_type_and_junk_items() {
        let record = ExtractionRecord::from_value(json!({
            "document_type": "Purchase Order",
            "metadata": {"po": "77", "empty": null},
            "line_items": ["not an item", {"qty": "3", "price": "1,50"}],
            "confidence": 0.4
        }))
        .unwrap();

        assert_eq!(record.document_type, DocumentType::Unknown);
        assert_eq!(record.metadata.len(), 1);
        assert_eq!(record.line_items.len(), 1);
        assert_eq!(record.line_items[0].description, "");
        assert_eq!(record.line_items[0].quantity, Some(Scalar::Text("3".to_string())));
    }

    #[test]
    fn test_non_object_payload() {
        assert!(matches!(
            ExtractionRecord::from_value(json!([1, 2])),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn test_metadata_order_preserved() {
        let record = ExtractionRecord::from_value(json!({
            "metadata": {"zeta": "1", "alpha": "2", "mid": "3"}
        }))
        .unwrap();
        let keys: Vec<&str> = record.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_pretty_json_shape() {
        let record = ExtractionRecord {
            document_type: DocumentType::Invoice,
            metadata: json!({"vendor_name": "Acme"}).as_object().unwrap().clone(),
            line_items: Vec::new(),
        };
        let text = String::from_utf8(record.to_pretty_json().unwrap()).unwrap();
        assert_eq!(
            text,
            "{\n    \"document_type\": \"Invoice\",\n    \"metadata\": {\n        \"vendor_name\": \"Acme\"\n    },\n    \"line_items\": []\n}\n"
        );
    }

    #[test]
    fn test_score_ignores_blank_fields() {
        let record = ExtractionRecord::from_value(json!({
            "metadata": {"a": "x", "b": "", "c": 3},
            "line_items": [{"description": "one"}]
        }))
        .unwrap();
        assert_eq!(record.score(), 3);
    }

    #[test]
    fn test_scalar_decimal() {
        assert_eq!(
            Scalar::Text("$1,000.50".into()).as_decimal(),
            Some(Decimal::new(100050, 2))
        );
        assert_eq!(Scalar::Number(7.into()).as_decimal(), Some(Decimal::new(7, 0)));
        assert_eq!(Scalar::Text("seven".into()).as_decimal(), None);
    }
}
