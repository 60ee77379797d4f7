//! Resume analysis stages
//!
//! The pure, I/O-free parts of the pipeline:
//! - [`sanitize`]: clean and truncate client text
//! - [`prompt`]: render the rubric prompt and the corrective re-prompt
//! - [`parse`]: recover a JSON object from noisy model output
//! - [`schema`]: validate that object into an [`AnalysisResult`]

pub mod parse;
pub mod prompt;
pub mod sanitize;
pub mod schema;

pub use parse::{ParseError, parse};
pub use prompt::{build_prompt, build_reprompt};
pub use sanitize::sanitize;
pub use schema::{SchemaError, validate};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest score a rubric category can receive
pub const MAX_SCORE: u8 = 5;

/// Rubric categories, in the order the model must return them
pub const RUBRIC_CATEGORIES: [&str; 5] = [
    "Content/Relevance",
    "Achievements/Results",
    "Skills/Keywords",
    "Organization/Formatting",
    "Professionalism",
];

/// Score for a single rubric category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScore {
    pub name: String,
    pub score: u8,
    pub max: u8,
}

/// A validated analysis, as returned to clients and stored in the cache
///
/// Only [`schema::validate`] constructs this type, so an instance always
/// holds exactly five scores in rubric order and at least one comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    scores: Vec<RubricScore>,
    comments: Vec<String>,
}

impl AnalysisResult {
    pub(crate) fn new(scores: Vec<RubricScore>, comments: Vec<String>) -> Self {
        Self { scores, comments }
    }

    /// Scores in rubric order
    pub fn scores(&self) -> &[RubricScore] {
        &self.scores
    }

    /// Reviewer comments
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Sum of all category scores
    pub fn total(&self) -> u32 {
        self.scores.iter().map(|s| u32::from(s.score)).sum()
    }
}

/// Why a model reply could not be turned into an [`AnalysisResult`]
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("unparsable model output: {0}")]
    Parse(#[from] ParseError),

    #[error("model output violates the response schema: {0}")]
    Schema(#[from] SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rubric_has_five_categories_in_order() {
        assert_eq!(RUBRIC_CATEGORIES.len(), 5);
        assert_eq!(RUBRIC_CATEGORIES[0], "Content/Relevance");
        assert_eq!(RUBRIC_CATEGORIES[4], "Professionalism");
    }

    #[test]
    fn test_result_serializes_to_contract_shape() {
        let result = AnalysisResult::new(
            RUBRIC_CATEGORIES
                .iter()
                .map(|name| RubricScore {
                    name: name.to_string(),
                    score: 3,
                    max: MAX_SCORE,
                })
                .collect(),
            vec!["Quantify your achievements.".to_string()],
        );

        let json = serde_json::to_value(&result).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(json["scores"][1]["name"], "Achievements/Results");
        assert_eq!(json["scores"][1]["score"], 3);
        assert_eq!(json["scores"][1]["max"], 5);
        assert_eq!(json["comments"][0], "Quantify your achievements.");
        assert_eq!(result.total(), 15);
    }
}
