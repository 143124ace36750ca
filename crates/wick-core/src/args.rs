// ABOUTME: Coerces command-line strings into typed payload values.
// ABOUTME: Order is integer, float, boolean, JSON object, JSON array, then plain string.

use serde_json::{Number, Value};
use wick_wamp::{Dict, List};

/// Coerce one command-line token.
///
/// A token wrapped in matching single or double quotes is always a string.
pub fn coerce(raw: &str) -> Value {
    if let Some(inner) = strip_quotes(raw) {
        return Value::String(inner.to_string());
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(uint) = raw.parse::<u64>() {
        return Value::from(uint);
    }
    if let Some(float) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(float);
    }
    if let Some(flag) = parse_bool(raw) {
        return Value::Bool(flag);
    }

    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(raw)
        {
            return value;
        }
    }

    Value::String(raw.to_string())
}

pub fn coerce_list<S: AsRef<str>>(raw: &[S]) -> List {
    raw.iter().map(|s| coerce(s.as_ref())).collect()
}

/// Later duplicates overwrite earlier ones.
pub fn coerce_dict(pairs: &[(String, String)]) -> Dict {
    pairs
        .iter()
        .map(|(key, value)| (key.clone(), coerce(value)))
        .collect()
}

/// Split a `key=value` token. Usable directly as a clap `value_parser`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid key=value pair: {raw:?}")),
    }
}

fn strip_quotes(raw: &str) -> Option<&str> {
    if raw.len() < 2 {
        return None;
    }
    ['"', '\'']
        .into_iter()
        .find_map(|quote| raw.strip_prefix(quote)?.strip_suffix(quote))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => Some(true),
        "f" | "F" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers() {
        assert_eq!(coerce("42"), json!(42));
        assert_eq!(coerce("-7"), json!(-7));
        assert_eq!(coerce("18446744073709551615"), json!(18446744073709551615u64));
        assert_eq!(coerce("1.5"), json!(1.5));
    }

    #[test]
    fn test_non_finite_floats_stay_strings() {
        assert_eq!(coerce("NaN"), json!("NaN"));
        assert_eq!(coerce("inf"), json!("inf"));
    }

    #[test]
    fn test_bools() {
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("F"), json!(false));
        // Integers win over booleans.
        assert_eq!(coerce("1"), json!(1));
    }

    #[test]
    fn test_json_containers() {
        assert_eq!(coerce(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(coerce("[1, \"x\"]"), json!([1, "x"]));
        assert_eq!(coerce("{not json"), json!("{not json"));
    }

    #[test]
    fn test_quoted_values_are_strings() {
        assert_eq!(coerce("\"42\""), json!("42"));
        assert_eq!(coerce("'true'"), json!("true"));
        assert_eq!(coerce("'mismatched\""), json!("'mismatched\""));
        assert_eq!(coerce("\""), json!("\""));
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(coerce("hello world"), json!("hello world"));
        assert_eq!(coerce(""), json!(""));
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("name=a=b").expect("should parse"),
            ("name".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").expect("should parse"),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_coerce_dict_and_list() {
        let dict = coerce_dict(&[
            ("acknowledge".to_string(), "true".to_string()),
            ("timeout".to_string(), "1000".to_string()),
        ]);
        assert_eq!(dict.get("acknowledge"), Some(&json!(true)));
        assert_eq!(dict.get("timeout"), Some(&json!(1000)));

        assert_eq!(coerce_list(&["1", "two"]), vec![json!(1), json!("two")]);
    }
}
