//! JSON API handlers for evaluations and usage status.

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::evaluation::pipeline::EvaluationReport;
use crate::evaluation::submission::{process_submission, Submission};
use crate::state::AppState;
use crate::usage::gate::{epoch_now, GateDecision};
use crate::usage::identity::CallerId;

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    #[serde(flatten)]
    pub report: EvaluationReport,
    pub admin: bool,
    pub next_eligible_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct UsageStatusResponse {
    pub user_id: String,
    pub allowed: bool,
    pub remaining_hours: Option<u64>,
    pub remaining_minutes: Option<u64>,
    pub cooldown_secs: u64,
}

/// POST /api/v1/evaluations
///
/// Multipart form with the same fields as the HTML form.
/// Blocked callers get 429 and no generation calls are made.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    multipart: Multipart,
) -> Result<Json<EvaluationResponse>, AppError> {
    let submission = Submission::from_multipart(multipart).await?;
    let done = process_submission(&state, &user_id, submission).await?;

    Ok(Json(EvaluationResponse {
        report: done.report,
        admin: done.admin,
        next_eligible_at: done.next_eligible_at,
    }))
}

/// GET /api/v1/usage
///
/// Cooldown status for the calling identity. Never mutates the store.
pub async fn handle_usage_status(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> Json<UsageStatusResponse> {
    let snapshot = state.ledger.snapshot().await;
    let decision = state.gate.evaluate(&snapshot, &user_id, epoch_now(), false);
    let (remaining_hours, remaining_minutes) = match decision {
        GateDecision::Allowed => (None, None),
        GateDecision::Blocked(r) => (Some(r.hours()), Some(r.minutes())),
    };

    Json(UsageStatusResponse {
        user_id,
        allowed: decision.is_allowed(),
        remaining_hours,
        remaining_minutes,
        cooldown_secs: state.gate.cooldown().as_secs(),
    })
}
