use serde::{Deserialize, Serialize};

pub const MIN_RESUME_LENGTH: usize = 100;
pub const MAX_RESUME_LENGTH: usize = 10_000;
pub const MIN_JOB_DESCRIPTION_LENGTH: usize = 50;

/// A resume is expected to mention at least one of these.
const STRUCTURAL_KEYWORDS: &[&str] = &["experience", "education", "skills", "work", "job", "project"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputValidationResult {
    pub passed: bool,
    pub violations: Vec<String>,
}

impl InputValidationResult {
    /// All violations in one human-readable message.
    pub fn message(&self) -> String {
        format!("Invalid analysis request: {}", self.violations.join("; "))
    }
}

/// Validates an analysis request, collecting every violated rule.
///
/// Lengths are in characters, measured on trimmed text.
pub fn validate_analysis_input(resume_text: &str, job_description: &str) -> InputValidationResult {
    let mut violations = Vec::new();

    let resume = resume_text.trim();
    let resume_len = resume.chars().count();
    if resume.is_empty() {
        violations.push("Resume text is empty".to_string());
    } else if resume_len < MIN_RESUME_LENGTH {
        violations.push(format!(
            "Resume text is too short ({resume_len} characters, minimum {MIN_RESUME_LENGTH})"
        ));
    } else if resume_len > MAX_RESUME_LENGTH {
        violations.push(format!(
            "Resume text is too long ({resume_len} characters, maximum {MAX_RESUME_LENGTH})"
        ));
    }

    if !resume.is_empty() {
        let lower = resume.to_lowercase();
        if !STRUCTURAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            violations.push(format!(
                "Resume text has no recognizable sections (expected one of: {})",
                STRUCTURAL_KEYWORDS.join(", ")
            ));
        }
    }

    let job = job_description.trim();
    let job_len = job.chars().count();
    if job.is_empty() {
        violations.push("Job description is empty".to_string());
    } else if job_len < MIN_JOB_DESCRIPTION_LENGTH {
        violations.push(format!(
            "Job description is too short ({job_len} characters, minimum {MIN_JOB_DESCRIPTION_LENGTH})"
        ));
    }

    InputValidationResult {
        passed: violations.is_empty(),
        violations,
    }
}
