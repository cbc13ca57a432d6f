//! One evaluation request end to end: gate → validate → pipeline → commit.
//!
//! Shared by the HTML form and the JSON API so both enforce the same rules.

use axum::extract::Multipart;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::evaluation::pipeline::{run_evaluation, EvaluationReport};
use crate::evaluation::requirements::{ExperienceBracket, HrRequirements};
use crate::evaluation::resume::{extract_text, has_content, ResumeKind};
use crate::state::AppState;
use crate::usage::gate::{epoch_now, GateDecision};
use crate::usage::store::CommitOutcome;

pub const MISSING_INPUT_MESSAGE: &str =
    "Please fill in both HR requirements and upload a resume.";

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Raw form fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub admin_code: Option<String>,
    pub role: String,
    pub core_skills: String,
    pub soft_skills: String,
    pub experience: Option<String>,
    pub resume: Option<ResumeUpload>,
}

impl Submission {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut submission = Submission::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let malformed = |e: axum::extract::multipart::MultipartError| {
                AppError::Validation(format!("Malformed form field '{name}': {e}"))
            };
            match name.as_str() {
                "admin_code" => submission.admin_code = Some(field.text().await.map_err(malformed)?),
                "role" => submission.role = field.text().await.map_err(malformed)?,
                "core_skills" => submission.core_skills = field.text().await.map_err(malformed)?,
                "soft_skills" => submission.soft_skills = field.text().await.map_err(malformed)?,
                "experience" => submission.experience = Some(field.text().await.map_err(malformed)?),
                "resume" => {
                    let file_name = field.file_name().map(String::from);
                    let content_type = field.content_type().map(String::from);
                    let data = field.bytes().await.map_err(malformed)?;
                    // An empty file input still arrives as a part with no bytes.
                    if !data.is_empty() {
                        submission.resume = Some(ResumeUpload {
                            file_name,
                            content_type,
                            data,
                        });
                    }
                }
                other => warn!("Ignoring unknown form field '{other}'"),
            }
        }

        Ok(submission)
    }
}

#[derive(Debug, Clone)]
pub struct CompletedEvaluation {
    pub report: EvaluationReport,
    pub admin: bool,
    /// `None` for admin runs.
    pub next_eligible_at: Option<DateTime<Utc>>,
}

pub async fn process_submission(
    state: &AppState,
    user_id: &str,
    submission: Submission,
) -> Result<CompletedEvaluation, AppError> {
    let now = epoch_now();
    let is_admin = state.gate.is_admin(submission.admin_code.as_deref());

    let snapshot = state.ledger.snapshot().await;
    if let GateDecision::Blocked(remaining) = state.gate.evaluate(&snapshot, user_id, now, is_admin) {
        info!("Rejected evaluation for {user_id}: cooldown {remaining} remaining");
        return Err(AppError::CooldownActive(remaining));
    }
    let expected = snapshot.last_used(user_id);

    let (requirements, resume_text) = validate(submission).await?;

    info!(
        "Running evaluation for {user_id} (role '{}', admin={is_admin})",
        requirements.role
    );
    let report = run_evaluation(state.generator.as_ref(), &requirements, &resume_text).await?;

    if is_admin {
        return Ok(CompletedEvaluation {
            report,
            admin: true,
            next_eligible_at: None,
        });
    }

    let gate = &state.gate;
    let outcome = state
        .ledger
        .compare_and_swap(user_id, expected, |store| gate.commit(store, user_id, now, false))
        .await?;
    // The cooldown runs from whatever timestamp is actually on record.
    let recorded_at = match outcome {
        CommitOutcome::Written => {
            info!("Recorded usage for {user_id}");
            now
        }
        CommitOutcome::Conflict { current } => current.unwrap_or(now),
    };

    Ok(CompletedEvaluation {
        report,
        admin: false,
        next_eligible_at: gate.next_eligible_at(recorded_at),
    })
}

/// Requires a role and a resume with extractable text.
async fn validate(submission: Submission) -> Result<(HrRequirements, String), AppError> {
    let Submission {
        role,
        core_skills,
        soft_skills,
        experience,
        resume,
        ..
    } = submission;

    let Some(resume) = resume.filter(|_| !role.trim().is_empty()) else {
        return Err(AppError::Validation(MISSING_INPUT_MESSAGE.to_string()));
    };

    let experience = match experience.as_deref().map(str::trim) {
        None | Some("") => ExperienceBracket::default(),
        Some(label) => label.parse()?,
    };

    let kind = ResumeKind::detect(resume.file_name.as_deref(), resume.content_type.as_deref())?;
    let resume_text = extract_text(kind, resume.data).await?;
    if !has_content(&resume_text) {
        return Err(AppError::Validation(MISSING_INPUT_MESSAGE.to_string()));
    }

    Ok((
        HrRequirements::from_form(&role, &core_skills, &soft_skills, experience),
        resume_text,
    ))
}
