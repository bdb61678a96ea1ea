//! Locating a JSON object inside free-form text.
//!
//! Models often wrap the requested JSON in prose or code fences. The contract
//! here: scan `{` positions left to right; for each, find the matching `}`
//! (braces inside string literals do not count); return the first such span
//! that decodes as a JSON object. Spans that are balanced but not valid JSON
//! are skipped. Unbalanced input yields `None`.

use serde_json::{Map, Value};

/// Return the first balanced `{...}` span of `text` that is a valid JSON object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut from = 0;

    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(len) = balanced_len(&text[start..]) {
            let candidate = &text[start..start + len];
            if serde_json::from_str::<Map<String, Value>>(candidate).is_ok() {
                return Some(candidate);
            }
        }
        from = start + 1;
    }

    None
}

/// Length of the brace-balanced prefix of `s`, which must start with `{`.
fn balanced_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
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

    #[test]
    fn bare_object() {
        let text = r#"{"primary_classification": "Builder"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn object_surrounded_by_prose() {
        let text = "Sure! Here is the result:\n{\"confidence\": \"High\"}\nLet me know if you need more.";
        assert_eq!(extract_json_object(text), Some("{\"confidence\": \"High\"}"));
    }

    #[test]
    fn object_inside_code_fence() {
        let text = "```json\n{\n  \"reasoning\": \"ships code\"\n}\n```";
        assert_eq!(
            extract_json_object(text),
            Some("{\n  \"reasoning\": \"ships code\"\n}")
        );
    }

    #[test]
    fn nested_objects_stay_whole() {
        let text = r#"result: {"a": {"b": {"c": 1}}, "d": 2} done"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": {"b": {"c": 1}}, "d": 2}"#)
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"{"reasoning": "uses {curly} and \"quoted }\" text", "x": 1} trailing }"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"reasoning": "uses {curly} and \"quoted }\" text", "x": 1}"#)
        );
    }

    #[test]
    fn first_of_several_objects_wins() {
        let text = r#"{"primary_classification": "Creative"} or maybe {"primary_classification": "Lifestyle"}"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"primary_classification": "Creative"}"#)
        );
    }

    #[test]
    fn skips_balanced_non_json_prefix() {
        let text = r#"Template {name} filled: {"confidence": "Low"}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"confidence": "Low"}"#));
    }

    #[test]
    fn unbalanced_output_is_none() {
        let text = r#"{"primary_classification": "Builder", "reasoning": "trunc"#;
        assert_eq!(extract_json_object(text), None);
    }

    #[test]
    fn no_braces_is_none() {
        assert_eq!(extract_json_object("I cannot classify this user."), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn arrays_are_not_objects() {
        assert_eq!(extract_json_object(r#"["Builder"]"#), None);
    }
}
