//! Locale-tolerant number parsing for rates published as text

use serde_json::Value;

/// Parses a JSON scalar into a rate.
///
/// Numbers are taken as-is, strings go through [`parse_number_str`]. Anything else is `None`.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number_str(s),
        _ => None,
    }
}

/// Parses text such as `"28,5%"`, `"1.234,56"` or `"12.5"`.
///
/// When both separators appear, `.` groups thousands and `,` is the decimal mark.
/// A lone `,` is also a decimal mark.
pub fn parse_number_str(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '%' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_percent_with_decimal_comma() {
        assert_eq!(parse_number_str("28,5%"), Some(28.5));
        assert_eq!(parse_number_str(" 54,2 % "), Some(54.2));
    }

    #[test]
    fn test_parse_thousands_and_decimal() {
        assert_eq!(parse_number_str("1.234,56"), Some(1234.56));
        assert_eq!(parse_number_str("12.5"), Some(12.5));
    }

    #[test]
    fn test_parse_invalid_text() {
        assert_eq!(parse_number_str("abc"), None);
        assert_eq!(parse_number_str(""), None);
        assert_eq!(parse_number_str("%"), None);
        assert_eq!(parse_number_str("NaN"), None);
    }

    #[test]
    fn test_parse_json_values() {
        assert_eq!(parse_number(&Value::Null), None);
        assert_eq!(parse_number(&json!(55)), Some(55.0));
        assert_eq!(parse_number(&json!(38.75)), Some(38.75));
        assert_eq!(parse_number(&json!("55")), Some(55.0));
        assert_eq!(parse_number(&json!(true)), None);
        assert_eq!(parse_number(&json!([1, 2])), None);
    }
}
