use crate::domain::model::ParsedDetails;
use crate::utils::error::NormalizationError;
use serde_json::{Map, Value};

/// Recovers a JSON object from a model response.
///
/// Clean JSON (what structured-output providers return) is accepted as is.
/// Otherwise the span from the first `{` to the last `}` is taken, trailing
/// commas are stripped, and the result is parsed. The span is not
/// nesting-aware: prose containing braces around the real object, or two
/// separate objects, corrupts it and the parse fails.
pub fn normalize_response(raw: &str) -> Result<ParsedDetails, NormalizationError> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(ParsedDetails::from_map(map));
    }

    let Some(span) = brace_span(raw) else {
        return Err(NormalizationError::NoJsonObject {
            raw: raw.to_string(),
        });
    };

    let cleaned = strip_trailing_commas(span);
    match serde_json::from_str::<Map<String, Value>>(&cleaned) {
        Ok(map) => Ok(ParsedDetails::from_map(map)),
        Err(source) => Err(NormalizationError::InvalidJson {
            raw: raw.to_string(),
            source,
        }),
    }
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Drops commas followed only by whitespace and a closing `}` or `]`.
/// String literals pass through untouched.
fn strip_trailing_commas(span: &str) -> String {
    let mut out = String::with_capacity(span.len());
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in span.char_indices() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' if span[idx + 1..].trim_start().starts_with(['}', ']']) => {}
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preamble_and_trailing_comma() {
        let parsed = normalize_response("preamble {\"a\": 1,}").unwrap();
        assert_eq!(parsed.into_value(), json!({"a": 1}));
    }

    #[test]
    fn test_markdown_fenced_response() {
        let raw = "Here is the data:\n```json\n{\n  \"account_holder_details\": {\"name\": \"Jane\"},\n  \"transactions\": [\n    {\"amount\": \"1.00\"},\n  ],\n}\n```\nLet me know!";
        let parsed = normalize_response(raw).unwrap();

        assert_eq!(
            parsed.into_value(),
            json!({
                "account_holder_details": {"name": "Jane"},
                "transactions": [{"amount": "1.00"}]
            })
        );
    }

    #[test]
    fn test_idempotent_on_valid_json() {
        let first = normalize_response("Sure! {\"bank_account_details\": {\"bank_name\": \"X\",},}")
            .unwrap();
        let text = serde_json::to_string(&first).unwrap();
        let second = normalize_response(&text).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_no_brace_keeps_raw_text() {
        let raw = "I could not find any account details.";
        let err = normalize_response(raw).unwrap_err();

        assert!(matches!(err, NormalizationError::NoJsonObject { .. }));
        assert_eq!(err.raw(), raw);
    }

    #[test]
    fn test_closing_brace_before_opening_is_not_a_span() {
        let err = normalize_response("} nothing here {").unwrap_err();
        assert!(matches!(err, NormalizationError::NoJsonObject { .. }));
    }

    #[test]
    fn test_invalid_span_keeps_raw_text() {
        let raw = "{\"a\": 1, \"b\": }";
        let err = normalize_response(raw).unwrap_err();

        assert!(matches!(err, NormalizationError::InvalidJson { .. }));
        assert_eq!(err.into_raw(), raw);
    }

    #[test]
    fn test_unrelated_braces_in_prose_corrupt_the_span() {
        let raw = "Use the {placeholder} format: {\"a\": 1}";
        let err = normalize_response(raw).unwrap_err();
        assert_eq!(err.raw(), raw);
    }

    #[test]
    fn test_multiple_objects_are_not_merged() {
        let raw = "First {\"a\": 1} and then {\"b\": 2}";
        assert!(normalize_response(raw).is_err());
    }

    #[test]
    fn test_nested_objects_inside_the_real_span_survive() {
        let raw = "Result: {\"outer\": {\"inner\": {\"x\": [1, 2,],},},} -- end";
        let parsed = normalize_response(raw).unwrap();
        assert_eq!(
            parsed.into_value(),
            json!({"outer": {"inner": {"x": [1, 2]}}})
        );
    }

    #[test]
    fn test_commas_inside_strings_are_kept() {
        let parsed = normalize_response("Sure: {\"desc\": \"Refund, }\", \"a\": 1,}").unwrap();
        assert_eq!(parsed.into_value(), json!({"desc": "Refund, }", "a": 1}));

        let raw = r#"Result {"memo": "said \"ok, ]\" twice", "rows": ["x", ],}"#;
        let parsed = normalize_response(raw).unwrap();
        assert_eq!(
            parsed.into_value(),
            json!({"memo": "said \"ok, ]\" twice", "rows": ["x"]})
        );
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        let err = normalize_response("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, NormalizationError::NoJsonObject { .. }));
    }
}
