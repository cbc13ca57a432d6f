//! Evaluation Orchestrator: three strictly sequential generation calls.
//!
//! Flow: resume → candidate summary → fit evaluation → HR recommendation.
//! Each step feeds the next. The pipeline succeeds or fails as a unit; the
//! caller commits usage only after `run_evaluation` returns `Ok`.

use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::evaluation::prompts::{FIT_EVALUATION_PROMPT, HR_ADVICE_PROMPT, RESUME_SUMMARY_PROMPT};
use crate::evaluation::requirements::HrRequirements;
use crate::llm_client::TextGenerator;

/// The three generated text blocks, passed to the renderer unmodified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub summary: String,
    pub evaluation: String,
    pub recommendation: String,
}

pub async fn run_evaluation(
    generator: &dyn TextGenerator,
    requirements: &HrRequirements,
    resume_text: &str,
) -> Result<EvaluationReport, AppError> {
    // Step 1: Resume summary
    let prompt = RESUME_SUMMARY_PROMPT.replace("{resume_text}", resume_text);
    let summary = generator
        .generate(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Resume summary failed: {e}")))?;
    info!("Candidate summary generated ({} chars)", summary.len());

    // Step 2: Fit evaluation
    let hr_profile_json = serde_json::to_string_pretty(requirements)
        .map_err(|e| AppError::Internal(e.into()))?;
    let prompt = FIT_EVALUATION_PROMPT
        .replace("{candidate_summary}", &summary)
        .replace("{hr_profile_json}", &hr_profile_json);
    let evaluation = generator
        .generate(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Fit evaluation failed: {e}")))?;
    info!("Fit evaluation generated for role '{}'", requirements.role);

    // Step 3: HR recommendation
    let prompt = HR_ADVICE_PROMPT.replace("{fit_evaluation}", &evaluation);
    let recommendation = generator
        .generate(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("HR recommendation failed: {e}")))?;

    Ok(EvaluationReport {
        summary,
        evaluation,
        recommendation,
    })
}
