//! Parse-or-degrade extraction of JSON objects embedded in model output.

use serde::de::DeserializeOwned;

/// Outcome of reading a structured object out of free text. Never an error:
/// text that does not hold one degrades with the reason kept alongside.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Structured(T),
    Degraded { raw: String, reason: DegradeReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// No `{ ... }` span in the text.
    NoObject,
    /// A span was found but it is not the expected shape.
    InvalidJson,
}

pub fn parse_or_degrade<T: DeserializeOwned>(text: &str) -> Parsed<T> {
    let Some(span) = object_span(text) else {
        return Parsed::Degraded {
            raw: text.to_string(),
            reason: DegradeReason::NoObject,
        };
    };

    if let Ok(value) = serde_json::from_str(span) {
        return Parsed::Structured(value);
    }
    // The balanced span can stop short when the model emits stray braces
    // inside prose; retry with the widest span before giving up.
    if let Some(wide) = widest_span(text) {
        if wide.len() != span.len() {
            if let Ok(value) = serde_json::from_str(wide) {
                return Parsed::Structured(value);
            }
        }
    }
    Parsed::Degraded {
        raw: text.to_string(),
        reason: DegradeReason::InvalidJson,
    }
}

/// First balanced `{ ... }` span, ignoring braces inside string literals.
/// Falls back to the widest span when the braces never balance.
pub fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    widest_span(text)
}

fn widest_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// First `limit` characters, with `...` appended when anything was cut.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let text = "Sure! Here is the plan:\n```json\n{\"analysis\": \"count\", \"plan\": []}\n```\nGood luck {not json}";
        assert_eq!(
            parse_or_degrade::<Value>(text),
            Parsed::Structured(json!({"analysis": "count", "plan": []}))
        );
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_span() {
        let text = r#"{"reasoning": "use {braces} and \"quotes\"", "n": 1} trailing"#;
        assert_eq!(
            object_span(text),
            Some(r#"{"reasoning": "use {braces} and \"quotes\"", "n": 1}"#)
        );
    }

    #[test]
    fn prose_without_object_degrades() {
        match parse_or_degrade::<Value>("I cannot help with that.") {
            Parsed::Degraded { raw, reason } => {
                assert_eq!(reason, DegradeReason::NoObject);
                assert_eq!(raw, "I cannot help with that.");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_object_degrades() {
        let parsed = parse_or_degrade::<Value>("{\"analysis\": oops}");
        assert!(matches!(
            parsed,
            Parsed::Degraded {
                reason: DegradeReason::InvalidJson,
                ..
            }
        ));
    }

    #[test]
    fn preview_counts_characters() {
        assert_eq!(preview("héllo", 3), "hél...");
        assert_eq!(preview("hé", 3), "hé");
    }
}
