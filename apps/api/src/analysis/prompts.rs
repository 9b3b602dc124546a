// Prompt for the resume/job comparison.
// The four top-level keys are a contract with the formatter and must not change.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(resume_text|job_description)\}").expect("placeholder pattern is valid")
});

/// Replace `{resume_text}` and `{job_description}` before sending.
pub const RESUME_COMPARISON_PROMPT_TEMPLATE: &str = r#"As a professional resume optimization expert, analyze this resume against the job description.

RESUME:
{resume_text}

JOB DESCRIPTION:
{job_description}

Provide specific recommendations in these categories:
1. Missing Skills/Experience
2. Content Improvements
3. Emphasis Opportunities
4. General Suggestions

Format your response as a JSON object with these exact keys:
{
  "missing_skills": [
    {"skill": "specific missing skill", "suggestion": "how to address this gap"}
  ],
  "improvement_suggestions": [
    {"current": "current text", "suggested": "improved version", "reason": "why this improves the match"}
  ],
  "emphasis_suggestions": [
    {"experience": "relevant experience", "why_relevant": "relevance to job", "how_to_emphasize": "emphasis suggestion"}
  ],
  "general_suggestions": [
    "specific actionable suggestion"
  ]
}

Rules:
- "current" MUST be copied verbatim from the resume so it can be replaced in place.
- "experience" MUST be a phrase that appears verbatim in the resume.
- Use empty lists for categories with nothing to suggest. Never omit a key."#;

/// Fills both placeholders in one pass over the template, so text inside
/// either input is never scanned for placeholders.
pub fn build_comparison_prompt(resume_text: &str, job_description: &str) -> String {
    PLACEHOLDER
        .replace_all(RESUME_COMPARISON_PROMPT_TEMPLATE, |caps: &Captures<'_>| {
            match &caps[1] {
                "resume_text" => resume_text,
                _ => job_description,
            }
            .to_string()
        })
        .into_owned()
}
