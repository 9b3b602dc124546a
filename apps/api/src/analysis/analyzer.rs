use async_trait::async_trait;
use tracing::{info, warn};

use crate::analysis::models::AnalysisResult;
use crate::analysis::prompts::build_comparison_prompt;
use crate::llm_client::{CompletionClient, CompletionError};

/// Compares a resume against a job description.
///
/// Implementations should return a complete four-key result or a typed error;
/// the orchestrator classifies the error and decides whether to retry.
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisResult, CompletionError>;
}

/// Completion-backed analyzer.
///
/// Shape violations are retried inside the completion client. When they
/// persist, the placeholder result is returned instead of an error.
/// Transport failures come back after a single call; the orchestrator
/// retries the whole step for those.
pub struct LlmResumeAnalyzer {
    client: CompletionClient,
}

impl LlmResumeAnalyzer {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            client: client.without_transport_retries(),
        }
    }
}

#[async_trait]
impl ResumeAnalyzer for LlmResumeAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisResult, CompletionError> {
        let request = self
            .client
            .request(build_comparison_prompt(resume_text, job_description));

        match self
            .client
            .complete_as(&request, AnalysisResult::from_model_output)
            .await
        {
            Ok(result) => {
                info!(
                    "Analysis complete: {} missing skills, {} improvements, {} emphasis, {} general",
                    result.missing_skills.len(),
                    result.improvement_suggestions.len(),
                    result.emphasis_suggestions.len(),
                    result.general_suggestions.len()
                );
                Ok(result)
            }
            Err(CompletionError::Malformed(detail)) => {
                warn!("Model output never matched the analysis shape: {}", detail);
                Ok(AnalysisResult::placeholder(&detail))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{Script, ScriptedBackend};
    use crate::llm_client::RetryPolicy;
    use std::time::Duration;

    const VALID: &str = r#"Sure, here it is:
{"missing_skills": [{"skill": "Terraform", "suggestion": "Add the IaC project"}],
 "improvement_suggestions": [],
 "emphasis_suggestions": [],
 "general_suggestions": ["Lead with the platform work"]}"#;

    fn analyzer(script: Vec<Script>) -> (LlmResumeAnalyzer, std::sync::Arc<ScriptedBackend>) {
        let backend = ScriptedBackend::new(script);
        let client = CompletionClient::new(backend.clone()).with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            retry_transport_errors: true,
        });
        (LlmResumeAnalyzer::new(client), backend)
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_output_is_parsed() {
        let (analyzer, backend) = analyzer(vec![Script::Fragments(vec![VALID])]);
        let result = analyzer.analyze("resume", "job").await.unwrap();
        assert_eq!(result.missing_skills[0].skill, "Terraform");
        assert_eq!(result.general_suggestions, vec!["Lead with the platform work"]);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_bad_shape_becomes_placeholder() {
        let (analyzer, backend) = analyzer(vec![Script::Fragments(vec![
            r#"{"missing_skills": "none", "general_suggestions": []}"#,
        ])]);
        let result = analyzer.analyze("resume", "job").await.unwrap();
        assert!(result.is_placeholder());
        assert_eq!(result.missing_skills[0].skill, "ERROR");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_shape_then_good_shape() {
        let (analyzer, _) = analyzer(vec![
            Script::Fragments(vec!["I cannot produce JSON today."]),
            Script::Fragments(vec![VALID]),
        ]);
        let result = analyzer.analyze("resume", "job").await.unwrap();
        assert!(!result.is_placeholder());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_propagate_after_one_call() {
        let (analyzer, backend) = analyzer(vec![Script::Fail(CompletionError::Backend(
            "connection refused".into(),
        ))]);
        assert!(matches!(
            analyzer.analyze("resume", "job").await,
            Err(CompletionError::Backend(_))
        ));
        assert_eq!(backend.call_count(), 1);
    }
}
