//! Schema and plausibility checks that turn a parsed payload into a [`ResultSet`].

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ValidationFailure;
use crate::models::{Preferences, Recommendation, ResultSet};
use crate::parser::ParsedPayload;

pub const MIN_RECOMMENDATIONS: usize = 3;
pub const MAX_RECOMMENDATIONS: usize = 5;
pub const PUBLICATION_YEARS: RangeInclusive<i64> = 1450..=2026;
pub const EXPLANATION_CHARS: RangeInclusive<usize> = 10..=1000;

/// Why a single candidate was dropped from the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateRejection {
    #[error("candidate is not a JSON object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' must be a non-empty string")]
    EmptyText(&'static str),

    #[error("publication_year is not an integer")]
    InvalidYear,

    #[error("publication_year {0} is outside the plausible range")]
    YearOutOfRange(i64),

    #[error("explanation has {0} characters")]
    ExplanationLength(usize),
}

/// Validate a parsed payload as a unit.
///
/// Over-long lists are cut to the first five before any item is checked.
/// Items that fail are dropped, survivors are deduplicated by normalised
/// title keeping the first, and fewer than three survivors fails the batch.
/// The preferences are accepted for context and are not consulted by the
/// current rules.
pub fn validate_batch(
    payload: &ParsedPayload,
    _preferences: &Preferences,
) -> Result<ResultSet, ValidationFailure> {
    let candidates = payload
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or(ValidationFailure::MissingRecommendations)?;

    if candidates.len() > MAX_RECOMMENDATIONS {
        debug!(
            received = candidates.len(),
            kept = MAX_RECOMMENDATIONS,
            "Truncating over-long recommendation list"
        );
    }

    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(MAX_RECOMMENDATIONS);
    for (index, candidate) in candidates.iter().take(MAX_RECOMMENDATIONS).enumerate() {
        match validate_candidate(candidate) {
            Ok(recommendation) => {
                if seen.insert(recommendation.normalized_title()) {
                    accepted.push(recommendation);
                } else {
                    debug!(index, title = %recommendation.title, "Dropping duplicate title");
                }
            }
            Err(reason) => {
                warn!(index, reason = %reason, "Dropping invalid recommendation");
            }
        }
    }

    if accepted.len() < MIN_RECOMMENDATIONS {
        return Err(ValidationFailure::TooFewValid {
            valid: accepted.len(),
            required: MIN_RECOMMENDATIONS,
        });
    }

    accepted.truncate(MAX_RECOMMENDATIONS);
    Ok(accepted)
}

/// Check one candidate. Nothing is repaired except numeric parsing of the year.
pub fn validate_candidate(candidate: &Value) -> Result<Recommendation, CandidateRejection> {
    let object = candidate.as_object().ok_or(CandidateRejection::NotAnObject)?;

    let title = text_field(object, "title")?;
    let author = text_field(object, "author")?;
    let explanation = text_field(object, "explanation")?;

    let year = object
        .get("publication_year")
        .ok_or(CandidateRejection::MissingField("publication_year"))
        .and_then(coerce_year)?;
    if !PUBLICATION_YEARS.contains(&year) {
        return Err(CandidateRejection::YearOutOfRange(year));
    }

    let explanation_chars = explanation.chars().count();
    if !EXPLANATION_CHARS.contains(&explanation_chars) {
        return Err(CandidateRejection::ExplanationLength(explanation_chars));
    }

    Ok(Recommendation {
        title,
        author,
        // In range, so it fits.
        publication_year: year as i32,
        explanation,
    })
}

fn text_field(object: &Map<String, Value>, name: &'static str) -> Result<String, CandidateRejection> {
    match object.get(name) {
        None | Some(Value::Null) => Err(CandidateRejection::MissingField(name)),
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
        Some(_) => Err(CandidateRejection::EmptyText(name)),
    }
}

/// Integers pass through, finite floats are truncated and numeric strings are parsed.
fn coerce_year(value: &Value) -> Result<i64, CandidateRejection> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or(CandidateRejection::InvalidYear),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| CandidateRejection::InvalidYear),
        _ => Err(CandidateRejection::InvalidYear),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FamiliarityLevel, Genre};
    use serde_json::json;

    fn preferences() -> Preferences {
        Preferences::new(
            vec![Genre::Fantasy],
            vec!["Book A".to_string(), "Book B".to_string()],
            FamiliarityLevel::new(3).unwrap(),
        )
        .unwrap()
    }

    fn candidate(title: &str, year: Value) -> Value {
        json!({
            "title": title,
            "author": "Some Author",
            "publication_year": year,
            "explanation": "You will love the atmosphere of this one."
        })
    }

    fn payload(candidates: Vec<Value>) -> ParsedPayload {
        match json!({ "recommendations": candidates }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(
            validate_candidate(&candidate("Old", json!(1300))),
            Err(CandidateRejection::YearOutOfRange(1300))
        );
        assert_eq!(
            validate_candidate(&candidate("Future", json!(2100))),
            Err(CandidateRejection::YearOutOfRange(2100))
        );

        let accepted = validate_candidate(&candidate("The Great Gatsby", json!(1925))).unwrap();
        assert_eq!(accepted.publication_year, 1925);
    }

    #[test]
    fn test_year_coercion() {
        assert_eq!(
            validate_candidate(&candidate("A", json!(" 1984 "))).unwrap().publication_year,
            1984
        );
        assert_eq!(
            validate_candidate(&candidate("A", json!(1984.0))).unwrap().publication_year,
            1984
        );
        assert_eq!(
            validate_candidate(&candidate("A", json!("nineteen"))),
            Err(CandidateRejection::InvalidYear)
        );
        assert_eq!(
            validate_candidate(&candidate("A", json!(true))),
            Err(CandidateRejection::InvalidYear)
        );
    }

    #[test]
    fn test_field_checks() {
        let mut missing = candidate("A", json!(2000));
        missing.as_object_mut().unwrap().remove("author");
        assert_eq!(
            validate_candidate(&missing),
            Err(CandidateRejection::MissingField("author"))
        );

        let blank_title = candidate("   ", json!(2000));
        assert_eq!(
            validate_candidate(&blank_title),
            Err(CandidateRejection::EmptyText("title"))
        );

        let mut short = candidate("A", json!(2000));
        short["explanation"] = json!("Too short");
        assert_eq!(
            validate_candidate(&short),
            Err(CandidateRejection::ExplanationLength(9))
        );

        let mut long = candidate("A", json!(2000));
        long["explanation"] = json!("x".repeat(1001));
        assert!(validate_candidate(&long).is_err());

        assert_eq!(
            validate_candidate(&json!("just a title")),
            Err(CandidateRejection::NotAnObject)
        );
    }

    #[test]
    fn test_duplicates_collapse_to_first_seen() {
        let batch = payload(vec![
            candidate("Piranesi", json!(2020)),
            candidate("  PIRANESI ", json!(2021)),
            candidate("Jonathan Strange & Mr Norrell", json!(2004)),
            candidate("The Night Circus", json!(2011)),
        ]);

        let result = validate_batch(&batch, &preferences()).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].title, "Piranesi");
        assert_eq!(result[0].publication_year, 2020);
    }

    #[test]
    fn test_too_few_valid_fails_the_batch() {
        let batch = payload(vec![
            candidate("A", json!(2000)),
            candidate("B", json!(1300)),
            candidate("a", json!(2001)),
        ]);

        assert_eq!(
            validate_batch(&batch, &preferences()),
            Err(ValidationFailure::TooFewValid { valid: 1, required: 3 })
        );
    }

    #[test]
    fn test_only_first_five_are_considered() {
        // The sixth item is never looked at, so the three invalid entries in
        // the first five leave too few survivors.
        let batch = payload(vec![
            candidate("A", json!(2000)),
            candidate("B", json!(1000)),
            candidate("C", json!(1000)),
            candidate("D", json!(1000)),
            candidate("E", json!(2000)),
            candidate("F", json!(2000)),
        ]);
        assert!(validate_batch(&batch, &preferences()).is_err());

        let batch = payload(
            ["A", "B", "C", "D", "E", "F", "G"]
                .iter()
                .map(|t| candidate(t, json!(2000)))
                .collect(),
        );
        let result = validate_batch(&batch, &preferences()).unwrap();
        let titles: Vec<_> = result.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_missing_recommendations_key() {
        let mut batch = payload(vec![]);
        batch.remove("recommendations");
        batch.insert("books".to_string(), json!([]));
        assert_eq!(
            validate_batch(&batch, &preferences()),
            Err(ValidationFailure::MissingRecommendations)
        );

        let mut not_a_list = ParsedPayload::new();
        not_a_list.insert("recommendations".to_string(), json!({"title": "A"}));
        assert_eq!(
            validate_batch(&not_a_list, &preferences()),
            Err(ValidationFailure::MissingRecommendations)
        );
    }
}
