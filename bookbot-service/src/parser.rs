//! Tolerant extraction of a JSON object from free-form model output.
//!
//! Stages run in a fixed order and each one only if the previous failed:
//! strip code fences, parse directly, parse the outermost `{...}` span, and
//! finally parse that span with trailing commas removed. The last stage is a
//! heuristic and is expected to fail on anything more broken than that.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, error};

use crate::error::ParseFailure;

/// A JSON object as produced by the model; expected to hold `recommendations`.
pub type ParsedPayload = Map<String, Value>;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*\s*").expect("Invalid code fence pattern"));

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("Invalid trailing comma pattern"));

pub fn parse_model_output(raw: &str) -> Result<ParsedPayload, ParseFailure> {
    let cleaned = strip_code_fences(raw);

    if let Some(object) = parse_object(&cleaned) {
        return Ok(object);
    }

    if let Some(span) = outermost_object_span(&cleaned) {
        if let Some(object) = parse_object(span) {
            debug!("Parsed JSON object embedded in surrounding text");
            return Ok(object);
        }

        let repaired = strip_trailing_commas(span);
        if let Some(object) = parse_object(&repaired) {
            debug!("Parsed JSON object after removing trailing commas");
            return Ok(object);
        }
    }

    error!(raw_output = %raw, "Output parsing failed; raw output preserved");
    Err(ParseFailure)
}

fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// From the first `{` to the last `}`, so nested objects stay inside the span.
fn outermost_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

fn parse_object(text: &str) -> Option<ParsedPayload> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &str = r#"{"recommendations": [{"title": "Dune", "author": "Frank Herbert", "publication_year": 1965, "explanation": "Sand, spice and politics."}]}"#;

    #[test]
    fn test_plain_json_object() {
        let parsed = parse_model_output(VALID).unwrap();
        assert_eq!(parsed["recommendations"][0]["title"], json!("Dune"));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let inputs = [VALID, "not json at all", "Sure! {\"a\": [1, 2,]} Enjoy"];
        for input in inputs {
            assert_eq!(parse_model_output(input), parse_model_output(input));
        }
    }

    #[test]
    fn test_fenced_json_matches_bare_json() {
        let bare = parse_model_output(VALID);
        assert!(bare.is_ok());

        let tagged = format!("```json\n{}\n```", VALID);
        let untagged = format!("```\n{}\n```", VALID);
        assert_eq!(parse_model_output(&tagged), bare);
        assert_eq!(parse_model_output(&untagged), bare);
    }

    #[test]
    fn test_object_inside_prose() {
        let wrapped = format!(
            "Here are some great picks for you:\n\n{}\n\nHappy reading!",
            VALID
        );
        assert_eq!(parse_model_output(&wrapped), parse_model_output(VALID));
    }

    #[test]
    fn test_nested_braces_are_kept_inside_the_span() {
        let raw = r#"Result: {"recommendations": [{"title": "A"}, {"title": "B"}]} -- end"#;
        let parsed = parse_model_output(raw).unwrap();
        assert_eq!(parsed["recommendations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_trailing_comma_is_repaired() {
        let raw = r#"{"recommendations": [{"title": "A"}, {"title": "B"},]}"#;
        let parsed = parse_model_output(raw).unwrap();
        assert_eq!(parsed["recommendations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_top_level_array_falls_back_to_inner_object() {
        let parsed = parse_model_output(r#"[{"title": "A"}]"#).unwrap();
        assert_eq!(parsed["title"], json!("A"));
    }

    #[test]
    fn test_non_object_without_braces_is_rejected() {
        assert_eq!(parse_model_output("[1, 2]"), Err(ParseFailure));
        assert_eq!(parse_model_output("42"), Err(ParseFailure));
        assert_eq!(parse_model_output(r#""a string""#), Err(ParseFailure));
    }

    #[test]
    fn test_unrepairable_output_fails() {
        assert_eq!(parse_model_output("I could not think of any books."), Err(ParseFailure));
        assert_eq!(
            parse_model_output(r#"{"recommendations": [{"title": "A" "author": "B"}]}"#),
            Err(ParseFailure)
        );
        assert_eq!(parse_model_output("} backwards {"), Err(ParseFailure));
    }
}
