// ABOUTME: Deterministic text rendering of call results, events and progress updates.
// ABOUTME: dump_raw writes one result argument verbatim for binary or streamed output.

use crate::error::FormatError;
use serde_json::Value;
use std::io::Write;
use wick_wamp::{decode_binary, Dict};

/// Multi-line rendering with pretty printed sections.
///
/// `details` is only shown when non-empty. With no args and no kwargs the
/// output is exactly `args: []\nkwargs: {}`.
pub fn render(args: &[Value], kwargs: &Dict, details: Option<&Dict>) -> String {
    let mut out = String::new();

    if let Some(details) = details.filter(|d| !d.is_empty()) {
        out.push_str("details:");
        out.push_str(&pretty(details));
        out.push('\n');
    }

    if args.is_empty() && kwargs.is_empty() {
        out.push_str("args: []\nkwargs: {}");
        return out;
    }

    let mut sections = Vec::with_capacity(2);
    if !args.is_empty() {
        sections.push(format!("args:{}", pretty(args)));
    }
    if !kwargs.is_empty() {
        sections.push(format!("kwargs:{}", pretty(kwargs)));
    }
    out.push_str(&sections.join("\n"));
    out
}

/// Single-line rendering for progressive results.
pub fn render_progress(args: &[Value], kwargs: &Dict) -> String {
    if args.is_empty() && kwargs.is_empty() {
        return "args: [] kwargs: {}".to_string();
    }

    let mut parts = Vec::with_capacity(2);
    if !args.is_empty() {
        parts.push(format!("args: {}", compact(args)));
    }
    if !kwargs.is_empty() {
        parts.push(format!("kwargs: {}", compact(kwargs)));
    }
    parts.join("  ")
}

/// Write `args[index]` to `out` without framing or trailing newline.
///
/// A null argument writes nothing; it marks the end of a binary stream.
pub fn dump_raw<W: Write>(args: &[Value], index: i64, out: &mut W) -> Result<(), FormatError> {
    let value = usize::try_from(index)
        .ok()
        .and_then(|i| args.get(i))
        .ok_or(FormatError::Index {
            index,
            len: args.len(),
        })?;

    match value {
        Value::Null => Ok(()),
        Value::String(s) => {
            match decode_binary(s) {
                Some(bytes) => out.write_all(&bytes)?,
                None => out.write_all(s.as_bytes())?,
            }
            Ok(())
        }
        other => Err(FormatError::Type {
            kind: kind_of(other),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Leading space keeps "args: [" on the header line for scalars and
// containers alike.
fn pretty<T: serde::Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(text) => format!(" {text}"),
        Err(e) => format!(" <unrenderable: {e}>"),
    }
}

fn compact<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unrenderable: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wick_wamp::encode_binary;

    fn dict(value: Value) -> Dict {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[], &Dict::new(), None), "args: []\nkwargs: {}");
        assert_eq!(
            render(&[], &Dict::new(), Some(&Dict::new())),
            "args: []\nkwargs: {}"
        );
    }

    #[test]
    fn test_render_args_and_kwargs() {
        let rendered = render(&[json!(1), json!("two")], &dict(json!({"k": true})), None);
        assert_eq!(
            rendered,
            "args: [\n  1,\n  \"two\"\n]\nkwargs: {\n  \"k\": true\n}"
        );
    }

    #[test]
    fn test_render_kwargs_only() {
        let rendered = render(&[], &dict(json!({"a": 1})), None);
        assert_eq!(rendered, "kwargs: {\n  \"a\": 1\n}");
    }

    #[test]
    fn test_render_details_first() {
        let rendered = render(&[json!(1)], &Dict::new(), Some(&dict(json!({"topic": "t"}))));
        assert_eq!(rendered, "details: {\n  \"topic\": \"t\"\n}\nargs: [\n  1\n]");
    }

    #[test]
    fn test_render_does_not_escape_html() {
        let rendered = render(&[json!("<a&b>")], &Dict::new(), None);
        assert!(rendered.contains("\"<a&b>\""));
    }

    #[test]
    fn test_render_progress() {
        assert_eq!(render_progress(&[], &Dict::new()), "args: [] kwargs: {}");
        assert_eq!(render_progress(&[json!(1)], &Dict::new()), "args: [1]");
        assert_eq!(
            render_progress(&[json!(1)], &dict(json!({"x": "y"}))),
            "args: [1]  kwargs: {\"x\":\"y\"}"
        );
        assert_eq!(
            render_progress(&[], &dict(json!({"x": 2}))),
            "kwargs: {\"x\":2}"
        );
    }

    #[test]
    fn test_dump_raw_string() {
        let mut out = Vec::new();
        dump_raw(&[json!("hello")], 0, &mut out).expect("should write");
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_dump_raw_binary() {
        let mut out = Vec::new();
        let payload = [0u8, 159, 146, 150, 10];
        dump_raw(&[json!(encode_binary(&payload))], 0, &mut out).expect("should write");
        assert_eq!(out, payload);
    }

    #[test]
    fn test_dump_raw_null_writes_nothing() {
        let mut out = Vec::new();
        dump_raw(&[json!("a"), Value::Null], 1, &mut out).expect("null is end of stream");
        assert!(out.is_empty());
    }

    #[test]
    fn test_dump_raw_index_errors() {
        let mut out = Vec::new();
        assert!(matches!(
            dump_raw(&[json!("a")], 1, &mut out),
            Err(FormatError::Index { index: 1, len: 1 })
        ));
        assert!(matches!(
            dump_raw(&[json!("a")], -1, &mut out),
            Err(FormatError::Index { index: -1, .. })
        ));
        assert!(matches!(
            dump_raw(&[], 0, &mut out),
            Err(FormatError::Index { len: 0, .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_dump_raw_type_error() {
        let mut out = Vec::new();
        let err = dump_raw(&[json!({"a": 1})], 0, &mut out).expect_err("objects are not raw");
        assert!(matches!(err, FormatError::Type { kind: "object" }));
    }
}
