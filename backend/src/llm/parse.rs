//! Tagged parsing of loosely-typed model output.
//!
//! Models return JSON most of the time. The tag forces every call site to
//! decide what happens the rest of the time; an unparsed response never
//! crosses a request boundary as an error.

use roastmywallet_ingest::strip_code_fences;
use serde_json::Value;

/// Outcome of parsing a model completion as JSON.
#[derive(Debug, Clone)]
pub enum ModelJson {
    Parsed(Value),
    /// Raw completion text, kept for logging.
    Unparsed(String),
}

impl ModelJson {
    /// Parse a completion, stripping markdown code fences first.
    pub fn from_completion(raw: &str) -> ModelJson {
        match serde_json::from_str(strip_code_fences(raw)) {
            Ok(value) => ModelJson::Parsed(value),
            Err(_) => ModelJson::Unparsed(raw.to_string()),
        }
    }

    /// The parsed object, or `None` (after logging) when parsing failed.
    /// Call sites supply their fallback on the `None` path.
    pub fn into_value(self) -> Option<Value> {
        match self {
            ModelJson::Parsed(value) => Some(value),
            ModelJson::Unparsed(raw) => {
                tracing::warn!(raw = %truncate(&raw, 200), "model output was not valid JSON");
                None
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Non-empty trimmed string field, if present.
pub fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Integer field; accepts a JSON number (rounded) or a numeric string.
pub fn i64_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_clean_json() {
        let parsed = ModelJson::from_completion(r#"{"roast": "ouch"}"#);
        let value = parsed.into_value().unwrap();
        assert_eq!(value["roast"], "ouch");
    }

    #[test]
    fn test_parses_fenced_json() {
        let parsed = ModelJson::from_completion("```json\n{\"a\": 1}\n```");
        assert!(parsed.into_value().is_some());
    }

    #[test]
    fn test_prose_is_unparsed() {
        let parsed = ModelJson::from_completion("Sorry, I can't help with that.");
        assert!(matches!(parsed, ModelJson::Unparsed(_)));
        assert!(parsed.into_value().is_none());
    }

    #[test]
    fn test_str_field_trims_and_rejects_empty() {
        let value = json!({"a": "  hi  ", "b": "", "c": 3});
        assert_eq!(str_field(&value, "a").as_deref(), Some("hi"));
        assert!(str_field(&value, "b").is_none());
        assert!(str_field(&value, "c").is_none());
        assert!(str_field(&value, "missing").is_none());
    }

    #[test]
    fn test_i64_field_accepts_number_float_and_string() {
        let value = json!({"int": 1250, "float": 1250.4, "text": "1250", "bad": []});
        assert_eq!(i64_field(&value, "int"), Some(1250));
        assert_eq!(i64_field(&value, "float"), Some(1250));
        assert_eq!(i64_field(&value, "text"), Some(1250));
        assert!(i64_field(&value, "bad").is_none());
    }
}
