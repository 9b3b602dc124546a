use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::json_extract::JsonObject;
use crate::llm_client::CompletionError;

/// Skill name carried by the placeholder result.
pub const PLACEHOLDER_SKILL: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSkill {
    pub skill: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSuggestion {
    pub current: String,
    pub suggested: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmphasisSuggestion {
    pub experience: String,
    pub why_relevant: String,
    pub how_to_emphasize: String,
}

/// The canonical four-key result of a resume/job comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisResult {
    pub missing_skills: Vec<MissingSkill>,
    pub improvement_suggestions: Vec<ImprovementSuggestion>,
    pub emphasis_suggestions: Vec<EmphasisSuggestion>,
    pub general_suggestions: Vec<String>,
}

impl AnalysisResult {
    /// Validates the shape of parsed model output: exactly the four keys, each
    /// a list of the right item type. Any violation is `Malformed`.
    pub fn from_model_output(json: JsonObject) -> Result<Self, CompletionError> {
        serde_json::from_value(Value::Object(json))
            .map_err(|e| CompletionError::Malformed(format!("analysis shape: {e}")))
    }

    /// Stand-in returned when the model never produced a usable analysis.
    pub fn placeholder(reason: &str) -> Self {
        Self {
            missing_skills: vec![MissingSkill {
                skill: PLACEHOLDER_SKILL.to_string(),
                suggestion: "The analysis could not be completed.".to_string(),
            }],
            improvement_suggestions: Vec::new(),
            emphasis_suggestions: Vec::new(),
            general_suggestions: vec![
                format!("Analysis failed: {reason}"),
                "Please try again, or shorten the resume and job description.".to_string(),
            ],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.missing_skills
            .first()
            .is_some_and(|s| s.skill == PLACEHOLDER_SKILL)
    }

    pub fn is_empty(&self) -> bool {
        self.missing_skills.is_empty()
            && self.improvement_suggestions.is_empty()
            && self.emphasis_suggestions.is_empty()
            && self.general_suggestions.is_empty()
    }

    /// Semantic completeness: every entry must carry non-blank text in each field.
    /// Returns every problem found.
    pub fn check_complete(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        for (i, s) in self.missing_skills.iter().enumerate() {
            blank_fields(
                &mut problems,
                "missing_skills",
                i,
                &[("skill", &s.skill), ("suggestion", &s.suggestion)],
            );
        }
        for (i, s) in self.improvement_suggestions.iter().enumerate() {
            blank_fields(
                &mut problems,
                "improvement_suggestions",
                i,
                &[
                    ("current", &s.current),
                    ("suggested", &s.suggested),
                    ("reason", &s.reason),
                ],
            );
        }
        for (i, s) in self.emphasis_suggestions.iter().enumerate() {
            blank_fields(
                &mut problems,
                "emphasis_suggestions",
                i,
                &[
                    ("experience", &s.experience),
                    ("why_relevant", &s.why_relevant),
                    ("how_to_emphasize", &s.how_to_emphasize),
                ],
            );
        }
        for (i, s) in self.general_suggestions.iter().enumerate() {
            if s.trim().is_empty() {
                problems.push(format!("general_suggestions[{i}] is blank"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

fn blank_fields(problems: &mut Vec<String>, list: &str, index: usize, fields: &[(&str, &String)]) {
    for (name, value) in fields {
        if value.trim().is_empty() {
            problems.push(format!("{list}[{index}].{name} is blank"));
        }
    }
}
