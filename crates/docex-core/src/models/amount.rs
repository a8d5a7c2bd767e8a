//! Lenient numeric parsing for OCR/LLM-produced amounts.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

lazy_static! {
    // Optional sign, currency markers on either side, digits with separators.
    static ref AMOUNT_TEXT: Regex = Regex::new(
        r"(?i)^\s*(?:[$€£¥]|usd|eur|gbp|pln|zł)?\s*(-?)\s*(?:[$€£¥]|usd|eur|gbp|pln|zł)?\s*(\d[\d\s\u{00a0},.']*)\s*(?:[$€£¥]|usd|eur|gbp|pln|zł)?\s*$"
    ).unwrap();
}

/// Parse an amount such as `"$1,234.56"`, `"1 234,56 zł"` or `"12"`.
///
/// Returns `None` for anything that carries text beyond a currency marker,
/// so `"3 boxes"` stays opaque.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let caps = AMOUNT_TEXT.captures(s)?;
    let negative = !caps[1].is_empty();

    let cleaned: String = caps[2]
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        // "1,234" is a thousands group, "12,5" is a decimal comma
        let tail = cleaned.rsplit(',').next().unwrap_or("");
        if tail.len() == 3 && !cleaned.starts_with(',') {
            cleaned.replace(',', "")
        } else {
            cleaned.replace(',', ".")
        }
    } else if cleaned.contains(',') && cleaned.contains('.') {
        // Whichever separator comes last is the decimal point
        let comma_pos = cleaned.rfind(',');
        let dot_pos = cleaned.rfind('.');
        match (comma_pos, dot_pos) {
            (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => cleaned.replace(',', ""),
            _ => cleaned,
        }
    } else if cleaned.matches('.').count() > 1 {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_amount("12"), Some(dec("12")));
        assert_eq!(parse_amount("1234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount(" 0.5 "), Some(dec("0.5")));
    }

    #[test]
    fn test_parse_currency_amounts() {
        assert_eq!(parse_amount("$50"), Some(dec("50")));
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1 234,56 zł"), Some(dec("1234.56")));
        assert_eq!(parse_amount("EUR 1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("-$20.00"), Some(dec("-20.00")));
    }

    #[test]
    fn test_comma_grouping_vs_decimal() {
        assert_eq!(parse_amount("1,234"), Some(dec("1234")));
        assert_eq!(parse_amount("12,5"), Some(dec("12.5")));
        assert_eq!(parse_amount("1.234.567"), Some(dec("1234567")));
    }

    #[test]
    fn test_non_numeric_text_is_rejected() {
        assert_eq!(parse_amount("3 boxes"), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount(""), None);
    }
}
