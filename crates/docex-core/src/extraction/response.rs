//! Locating and decoding the JSON object in a model response.
//!
//! Models wrap their answer in prose or markdown fences. The primary rule
//! slices from the first `{` to the last `}`. When that slice does not
//! decode (prose containing braces, two objects back to back), the response
//! is scanned for balanced objects. The first one carrying a record key
//! (`document_type`, `type`, `metadata`, `line_items`) wins, so placeholder
//! objects such as `{}` in surrounding prose are passed over. Without such
//! an object the first decodable one is used.

use serde_json::Value;
use tracing::debug;

use crate::error::ParseError;
use crate::models::record::ExtractionRecord;

/// Parse a raw model response into a normalized record.
pub fn parse_response(raw: &str) -> Result<ExtractionRecord, ParseError> {
    let value = locate_json(raw)?;
    ExtractionRecord::from_value(value)
}

/// Find and decode the JSON object embedded in `raw`.
pub fn locate_json(raw: &str) -> Result<Value, ParseError> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(ParseError::NoJsonObject);
    };
    if end < start {
        return Err(ParseError::NoJsonObject);
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!("First-to-last brace slice is not JSON ({}), scanning", err);
            scan_balanced_objects(raw).ok_or_else(|| ParseError::InvalidJson(err.to_string()))
        }
    }
}

/// Top-level keys that mark an object as an extraction payload.
const RECORD_KEYS: &[&str] = &["document_type", "type", "metadata", "line_items"];

fn has_record_key(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| RECORD_KEYS.iter().any(|key| obj.contains_key(*key)))
}

/// Best `{...}` span, balanced outside of string literals, that decodes.
fn scan_balanced_objects(raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let mut fallback = None;

    for (start, _) in raw.match_indices('{') {
        let Some(end) = balanced_end(bytes, start) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&raw[start..=end]) else {
            continue;
        };
        if has_record_key(&value) {
            return Some(value);
        }
        fallback.get_or_insert(value);
    }
    fallback
}

/// Index of the `}` closing the `{` at `start`.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::DocumentType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PAYLOAD: &str = r#"{"document_type":"Invoice","metadata":{"vendor_name":"Acme","invoice_number":"123"},"line_items":[]}"#;

    #[test]
    fn test_bare_object() {
        assert_eq!(
            locate_json(PAYLOAD).unwrap(),
            serde_json::from_str::<Value>(PAYLOAD).unwrap()
        );
    }

    #[test]
    fn test_prose_and_fences_are_tolerated() {
        let wrapped = format!(
            "Sure! Here is the extracted data:\n```json\n{}\n```\nLet me know if you need more.",
            PAYLOAD
        );
        let record = parse_response(&wrapped).unwrap();
        assert_eq!(record.document_type, DocumentType::Invoice);
        assert_eq!(record.metadata["invoice_number"], json!("123"));
        assert!(record.line_items.is_empty());
    }

    #[test]
    fn test_braces_in_trailing_prose_fall_back_to_scan() {
        let raw = format!("{}\nNote: fields in {{braces}} were guessed.", PAYLOAD);
        assert_eq!(
            locate_json(&raw).unwrap(),
            serde_json::from_str::<Value>(PAYLOAD).unwrap()
        );
    }

    #[test]
    fn test_braces_in_leading_prose_fall_back_to_scan() {
        let raw = format!("Template {{field}} filled:\n{}", PAYLOAD);
        assert_eq!(
            locate_json(&raw).unwrap(),
            serde_json::from_str::<Value>(PAYLOAD).unwrap()
        );
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"Result: {"metadata": {"note": "see } and { here"}, "line_items": []} done"#;
        let value = locate_json(raw).unwrap();
        assert_eq!(value["metadata"]["note"], json!("see } and { here"));
    }

    #[test]
    fn test_placeholder_object_in_prose_is_passed_over() {
        let raw = format!("Use {{}} for empty fields. {}", PAYLOAD);
        let record = parse_response(&raw).unwrap();
        assert_eq!(record.document_type, DocumentType::Invoice);
        assert_eq!(record.metadata["vendor_name"], json!("Acme"));
    }

    #[test]
    fn test_scan_without_record_keys_keeps_first_object() {
        let raw = r#"Options: {"a": {"b": 1}} or {"c": 2}, pick {one}"#;
        assert_eq!(locate_json(raw).unwrap(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_wrapped_payload_is_found() {
        let raw = format!("{{\"result\": {}}} and {{}}", PAYLOAD);
        let record = parse_response(&raw).unwrap();
        assert_eq!(record.document_type, DocumentType::Invoice);
    }

    #[test]
    fn test_no_braces_is_no_json_object() {
        assert!(matches!(
            parse_response("I could not read this document."),
            Err(ParseError::NoJsonObject)
        ));
        assert!(matches!(locate_json("} backwards {"), Err(ParseError::NoJsonObject)));
    }

    #[test]
    fn test_broken_json_is_invalid() {
        assert!(matches!(
            parse_response(r#"{"document_type": "Invoice", "metadata": {"#),
            Err(ParseError::NoJsonObject) | Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_response(r#"{"document_type": Invoice}"#),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_missing_line_items_defaults_to_empty() {
        let record = parse_response(r#"{"document_type": "PackingList", "metadata": {}}"#).unwrap();
        assert_eq!(record.document_type, DocumentType::PackingList);
        assert_eq!(record.line_items, vec![]);
    }
}
