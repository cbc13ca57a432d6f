//! Server-rendered HTML surface: landing page, admin unlock, analyze form.

pub mod pages;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::evaluation::submission::{process_submission, Submission};
use crate::state::AppState;
use crate::usage::gate::{epoch_now, GateDecision};
use crate::usage::identity::CallerId;
use pages::{render_page, FormDraft, Notice, Page, PageBody};

#[derive(Debug, Deserialize)]
pub struct AdminAccessForm {
    #[serde(default)]
    pub admin_code: Option<String>,
}

impl From<&Submission> for FormDraft {
    fn from(submission: &Submission) -> Self {
        FormDraft {
            role: submission.role.clone(),
            core_skills: submission.core_skills.clone(),
            soft_skills: submission.soft_skills.clone(),
            experience: submission.experience.clone(),
        }
    }
}

/// GET /
pub async fn handle_landing(State(state): State<AppState>, CallerId(user_id): CallerId) -> Response {
    landing(&state, &user_id, None, None, FormDraft::default()).await
}

/// POST /
///
/// Re-renders the landing page with an admin code applied.
pub async fn handle_admin_access(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Form(form): Form<AdminAccessForm>,
) -> Response {
    landing(&state, &user_id, form.admin_code, None, FormDraft::default()).await
}

/// POST /analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    multipart: Multipart,
) -> Response {
    let submission = match Submission::from_multipart(multipart).await {
        Ok(s) => s,
        Err(e) => return failure(&state, &user_id, None, FormDraft::default(), e).await,
    };
    let admin_code = submission.admin_code.clone();
    let draft = FormDraft::from(&submission);

    match process_submission(&state, &user_id, submission).await {
        Ok(done) => render(
            &state,
            StatusCode::OK,
            PageBody::Results {
                report: done.report,
                admin: done.admin,
                next_eligible_at: done.next_eligible_at,
            },
        ),
        Err(e) => failure(&state, &user_id, admin_code, draft, e).await,
    }
}

/// Gate first: a blocked caller sees the block message and never the form.
async fn landing(
    state: &AppState,
    user_id: &str,
    admin_code: Option<String>,
    notice: Option<Notice>,
    draft: FormDraft,
) -> Response {
    let is_admin = state.gate.is_admin(admin_code.as_deref());
    let snapshot = state.ledger.snapshot().await;

    match state.gate.evaluate(&snapshot, user_id, epoch_now(), is_admin) {
        GateDecision::Blocked(remaining) => {
            render(state, StatusCode::TOO_MANY_REQUESTS, PageBody::Blocked { remaining })
        }
        GateDecision::Allowed => {
            let notice = match (&admin_code, is_admin) {
                (Some(code), false) if !code.is_empty() && notice.is_none() => {
                    Some(Notice::error("Invalid admin access code."))
                }
                _ => notice,
            };
            render(
                state,
                StatusCode::OK,
                PageBody::Form {
                    admin: is_admin,
                    admin_code: admin_code.filter(|_| is_admin),
                    notice,
                    draft,
                },
            )
        }
    }
}

async fn failure(
    state: &AppState,
    user_id: &str,
    admin_code: Option<String>,
    draft: FormDraft,
    err: AppError,
) -> Response {
    let status = err.status_code();
    match err {
        AppError::CooldownActive(remaining) => {
            render(state, StatusCode::TOO_MANY_REQUESTS, PageBody::Blocked { remaining })
        }
        AppError::Validation(_) | AppError::UnprocessableEntity(_) => {
            let notice = Notice::warning(err.user_message());
            with_status(landing(state, user_id, admin_code, Some(notice), draft).await, status)
        }
        _ => {
            tracing::error!("Evaluation failed for {user_id}: {err}");
            let notice = Notice::error(err.user_message());
            with_status(landing(state, user_id, admin_code, Some(notice), draft).await, status)
        }
    }
}

/// Keeps a blocked landing page's 429; otherwise applies `status`.
fn with_status(mut response: Response, status: StatusCode) -> Response {
    if response.status() == StatusCode::OK {
        *response.status_mut() = status;
    }
    response
}

fn render(state: &AppState, status: StatusCode, body: PageBody) -> Response {
    let page = Page {
        contact_url: state.config.admin_contact_url.clone(),
        cooldown: state.gate.cooldown(),
        body,
    };
    (status, Html(render_page(&page))).into_response()
}
