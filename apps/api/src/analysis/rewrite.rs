//! Best-effort textual rewrite of a resume from an analysis.
//!
//! Improvement suggestions replace the first exact occurrence of `current`
//! with `suggested`; emphasized experiences are wrapped in [`EMPHASIS_MARKER`].
//! Suggestions whose text does not occur verbatim are skipped.

use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::models::AnalysisResult;

pub const EMPHASIS_MARKER: &str = "**";

/// Rewritten text may not grow past this multiple of the original.
const MAX_GROWTH_FACTOR: usize = 4;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("rewrite grew the resume from {original} to {rewritten} characters")]
    Runaway { original: usize, rewritten: usize },
}

pub fn rewrite_resume(resume_text: &str, analysis: &AnalysisResult) -> Result<String, RewriteError> {
    let mut text = resume_text.to_string();
    let mut applied = 0usize;

    for improvement in &analysis.improvement_suggestions {
        let current = improvement.current.trim();
        if current.is_empty() || current == improvement.suggested.trim() {
            continue;
        }
        if text.contains(current) {
            text = text.replacen(current, improvement.suggested.trim(), 1);
            applied += 1;
        }
    }

    for emphasis in &analysis.emphasis_suggestions {
        let experience = emphasis.experience.trim();
        if experience.is_empty() {
            continue;
        }
        let marked = format!("{EMPHASIS_MARKER}{experience}{EMPHASIS_MARKER}");
        if text.contains(&marked) {
            continue;
        }
        if text.contains(experience) {
            text = text.replacen(experience, &marked, 1);
            applied += 1;
        }
    }

    let original = resume_text.chars().count();
    let rewritten = text.chars().count();
    if rewritten > original.saturating_mul(MAX_GROWTH_FACTOR).max(original + 1000) {
        return Err(RewriteError::Runaway {
            original,
            rewritten,
        });
    }

    debug!("Applied {} rewrite edits", applied);
    Ok(text)
}

/// Like [`rewrite_resume`], but falls back to the unmodified text on any error.
pub fn rewrite_or_original(resume_text: &str, analysis: &AnalysisResult) -> String {
    match rewrite_resume(resume_text, analysis) {
        Ok(text) => text,
        Err(e) => {
            warn!("Resume rewrite abandoned: {}", e);
            resume_text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::{EmphasisSuggestion, ImprovementSuggestion};

    fn improvement(current: &str, suggested: &str) -> ImprovementSuggestion {
        ImprovementSuggestion {
            current: current.into(),
            suggested: suggested.into(),
            reason: "clearer".into(),
        }
    }

    fn emphasis(experience: &str) -> EmphasisSuggestion {
        EmphasisSuggestion {
            experience: experience.into(),
            why_relevant: "matches the role".into(),
            how_to_emphasize: "move it up".into(),
        }
    }

    const RESUME: &str = "Experience\nWorked on APIs at Acme.\nLed the on-call rotation.\nWorked on APIs again.";

    #[test]
    fn test_replaces_first_exact_occurrence() {
        let analysis = AnalysisResult {
            improvement_suggestions: vec![improvement("Worked on APIs", "Built 12 REST APIs")],
            ..Default::default()
        };
        let text = rewrite_resume(RESUME, &analysis).unwrap();
        assert!(text.contains("Built 12 REST APIs at Acme."));
        assert!(text.contains("Worked on APIs again."));
    }

    #[test]
    fn test_wraps_emphasized_experience() {
        let analysis = AnalysisResult {
            emphasis_suggestions: vec![emphasis("Led the on-call rotation")],
            ..Default::default()
        };
        let text = rewrite_resume(RESUME, &analysis).unwrap();
        assert!(text.contains("**Led the on-call rotation**."));

        // already marked text is left alone
        let again = rewrite_resume(&text, &analysis).unwrap();
        assert_eq!(again, text);
    }

    #[test]
    fn test_skips_text_not_in_resume() {
        let analysis = AnalysisResult {
            improvement_suggestions: vec![improvement("Managed a team of 40", "Led 40 engineers")],
            emphasis_suggestions: vec![emphasis("Kubernetes migration"), emphasis("  ")],
            ..Default::default()
        };
        assert_eq!(rewrite_resume(RESUME, &analysis).unwrap(), RESUME);
    }

    #[test]
    fn test_empty_current_is_ignored() {
        let analysis = AnalysisResult {
            improvement_suggestions: vec![improvement("", "inserted everywhere")],
            ..Default::default()
        };
        assert_eq!(rewrite_resume(RESUME, &analysis).unwrap(), RESUME);
    }

    #[test]
    fn test_runaway_growth_falls_back_to_original() {
        let analysis = AnalysisResult {
            improvement_suggestions: vec![improvement("APIs", &"x".repeat(5000))],
            ..Default::default()
        };
        assert!(matches!(
            rewrite_resume(RESUME, &analysis),
            Err(RewriteError::Runaway { .. })
        ));
        assert_eq!(rewrite_or_original(RESUME, &analysis), RESUME);
    }
}
