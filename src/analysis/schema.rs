//! Response contract enforcement
//!
//! Turns a recovered JSON object into an [`AnalysisResult`], or explains why
//! it can't. The error message is fed back to the model in the re-prompt, so
//! it names the offending field.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{AnalysisResult, MAX_SCORE, RUBRIC_CATEGORIES, RubricScore};

/// Ways a model reply can violate the response schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required key \"{0}\"")]
    MissingField(&'static str),

    #[error("unexpected top-level key \"{0}\"")]
    UnexpectedField(String),

    #[error("\"{field}\" must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("\"scores\" has {0} entries, expected 5")]
    WrongScoreCount(usize),

    #[error("scores[{index}] is named \"{found}\", expected \"{expected}\"")]
    WrongCategory {
        index: usize,
        found: String,
        expected: &'static str,
    },

    #[error("scores[{index}].score is {score}, expected 0 to 5")]
    ScoreOutOfRange { index: usize, score: i64 },

    #[error("\"comments\" must not be empty")]
    NoComments,
}

/// Validate a JSON object against the analysis response contract
///
/// Requires exactly the keys `scores` and `comments`; five scores named
/// after the rubric categories in order, each with an integer `score` in
/// `0..=5` and an integer `max`; and a non-empty list of string comments.
pub fn validate(value: &Value) -> Result<AnalysisResult, SchemaError> {
    let object = value.as_object().ok_or_else(|| SchemaError::WrongType {
        field: "response".to_string(),
        expected: "a JSON object",
    })?;

    if let Some(extra) = object
        .keys()
        .find(|key| key.as_str() != "scores" && key.as_str() != "comments")
    {
        return Err(SchemaError::UnexpectedField(extra.clone()));
    }

    let scores = validate_scores(object)?;
    let comments = validate_comments(object)?;

    Ok(AnalysisResult::new(scores, comments))
}

fn validate_scores(object: &Map<String, Value>) -> Result<Vec<RubricScore>, SchemaError> {
    let entries = object
        .get("scores")
        .ok_or(SchemaError::MissingField("scores"))?
        .as_array()
        .ok_or_else(|| SchemaError::WrongType {
            field: "scores".to_string(),
            expected: "an array",
        })?;

    if entries.len() != RUBRIC_CATEGORIES.len() {
        return Err(SchemaError::WrongScoreCount(entries.len()));
    }

    entries
        .iter()
        .zip(RUBRIC_CATEGORIES)
        .enumerate()
        .map(|(index, (entry, expected))| validate_score(index, entry, expected))
        .collect()
}

fn validate_score(
    index: usize,
    entry: &Value,
    expected: &'static str,
) -> Result<RubricScore, SchemaError> {
    let wrong_type = |field: &str, expected: &'static str| SchemaError::WrongType {
        field: format!("scores[{index}]{field}"),
        expected,
    };

    let entry = entry.as_object().ok_or_else(|| wrong_type("", "an object"))?;

    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| wrong_type(".name", "a string"))?;
    if name != expected {
        return Err(SchemaError::WrongCategory {
            index,
            found: name.to_string(),
            expected,
        });
    }

    let score = entry
        .get("score")
        .and_then(Value::as_i64)
        .ok_or_else(|| wrong_type(".score", "an integer"))?;
    if !(0..=i64::from(MAX_SCORE)).contains(&score) {
        return Err(SchemaError::ScoreOutOfRange { index, score });
    }

    let max = entry
        .get("max")
        .and_then(Value::as_i64)
        .ok_or_else(|| wrong_type(".max", "an integer"))?;
    let max = u8::try_from(max).map_err(|_| wrong_type(".max", "an integer from 0 to 255"))?;

    Ok(RubricScore {
        name: name.to_string(),
        score: score as u8,
        max,
    })
}

fn validate_comments(object: &Map<String, Value>) -> Result<Vec<String>, SchemaError> {
    let entries = object
        .get("comments")
        .ok_or(SchemaError::MissingField("comments"))?
        .as_array()
        .ok_or_else(|| SchemaError::WrongType {
            field: "comments".to_string(),
            expected: "an array",
        })?;

    if entries.is_empty() {
        return Err(SchemaError::NoComments);
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, comment)| {
            comment
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| SchemaError::WrongType {
                    field: format!("comments[{index}]"),
                    expected: "a string",
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "scores": [
                {"name": "Content/Relevance", "score": 4, "max": 5},
                {"name": "Achievements/Results", "score": 3, "max": 5},
                {"name": "Skills/Keywords", "score": 5, "max": 5},
                {"name": "Organization/Formatting", "score": 2, "max": 5},
                {"name": "Professionalism", "score": 0, "max": 5}
            ],
            "comments": ["Quantify the impact of each role.", "Add a skills section."]
        })
    }

    #[test]
    fn test_valid_document_passes() {
        let result = validate(&valid()).expect("valid document");
        assert_eq!(result.scores().len(), 5);
        assert_eq!(result.scores()[2].score, 5);
        assert_eq!(result.comments().len(), 2);
        assert_eq!(result.total(), 14);
    }

    #[test]
    fn test_missing_scores_fails() {
        let mut doc = valid();
        doc.as_object_mut().unwrap().remove("scores");
        assert_eq!(validate(&doc), Err(SchemaError::MissingField("scores")));
    }

    #[test]
    fn test_missing_comments_fails() {
        let mut doc = valid();
        doc.as_object_mut().unwrap().remove("comments");
        assert_eq!(validate(&doc), Err(SchemaError::MissingField("comments")));
    }

    #[test]
    fn test_wrong_score_count_fails() {
        let mut doc = valid();
        doc["scores"].as_array_mut().unwrap().pop();
        assert_eq!(validate(&doc), Err(SchemaError::WrongScoreCount(4)));

        let mut doc = valid();
        let extra = doc["scores"][0].clone();
        doc["scores"].as_array_mut().unwrap().push(extra);
        assert_eq!(validate(&doc), Err(SchemaError::WrongScoreCount(6)));
    }

    #[test]
    fn test_score_out_of_range_fails() {
        for bad in [-1, 6, 100] {
            let mut doc = valid();
            doc["scores"][1]["score"] = json!(bad);
            assert_eq!(
                validate(&doc),
                Err(SchemaError::ScoreOutOfRange {
                    index: 1,
                    score: bad
                })
            );
        }
    }

    #[test]
    fn test_fractional_score_fails() {
        let mut doc = valid();
        doc["scores"][0]["score"] = json!(3.5);
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::WrongType { ref field, .. }) if field == "scores[0].score"
        ));
    }

    #[test]
    fn test_string_score_fails() {
        let mut doc = valid();
        doc["scores"][0]["score"] = json!("3");
        assert!(validate(&doc).is_err());
    }

    #[test]
    fn test_missing_max_fails() {
        let mut doc = valid();
        doc["scores"][3].as_object_mut().unwrap().remove("max");
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::WrongType { ref field, .. }) if field == "scores[3].max"
        ));
    }

    #[test]
    fn test_wrong_category_order_fails() {
        let mut doc = valid();
        doc["scores"].as_array_mut().unwrap().swap(0, 1);
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::WrongCategory { index: 0, .. })
        ));
    }

    #[test]
    fn test_extra_top_level_key_fails() {
        let mut doc = valid();
        doc["total"] = json!(14);
        assert_eq!(
            validate(&doc),
            Err(SchemaError::UnexpectedField("total".to_string()))
        );
    }

    #[test]
    fn test_empty_comments_fails() {
        let mut doc = valid();
        doc["comments"] = json!([]);
        assert_eq!(validate(&doc), Err(SchemaError::NoComments));
    }

    #[test]
    fn test_non_string_comment_fails() {
        let mut doc = valid();
        doc["comments"] = json!(["fine", 42]);
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::WrongType { ref field, .. }) if field == "comments[1]"
        ));
    }

    #[test]
    fn test_non_object_fails() {
        assert!(validate(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_error_messages_name_the_field() {
        assert_eq!(
            SchemaError::WrongScoreCount(4).to_string(),
            "\"scores\" has 4 entries, expected 5"
        );
        assert_eq!(
            SchemaError::ScoreOutOfRange { index: 2, score: 7 }.to_string(),
            "scores[2].score is 7, expected 0 to 5"
        );
    }
}
