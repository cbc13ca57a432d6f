use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::usage::gate::Remaining;
use crate::usage::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Cooldown active, try again after {0}")]
    CooldownActive(Remaining),

    #[error("Usage store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => ("UNPROCESSABLE_ENTITY", msg.clone()),
            AppError::CooldownActive(remaining) => {
                let body = Json(json!({
                    "error": {
                        "code": "COOLDOWN_ACTIVE",
                        "message": self.user_message(),
                        "remaining_hours": remaining.hours(),
                        "remaining_minutes": remaining.minutes(),
                    }
                }));
                return (status, body).into_response();
            }
            AppError::Store(e) => {
                tracing::error!("Usage store error: {e}");
                ("STORE_ERROR", "Usage could not be recorded".to_string())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                ("LLM_ERROR", "An AI processing error occurred".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ("INTERNAL_ERROR", "An internal server error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CooldownActive(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Llm(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show in the HTML surface.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::UnprocessableEntity(msg) => msg.clone(),
            AppError::CooldownActive(remaining) => {
                format!("You already used this app. Try again after {remaining}.")
            }
            AppError::Llm(_) => {
                "The AI evaluation failed. No usage was recorded; please try again.".to_string()
            }
            AppError::Store(_) | AppError::Internal(_) => {
                "Something went wrong on our side. Please try again later.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::CooldownActive(Remaining { seconds: 60.0 }),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (AppError::Llm("x".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::Internal(anyhow::anyhow!("x")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_llm_details_are_not_shown_to_users() {
        let err = AppError::Llm("API key not valid".into());
        assert!(!err.user_message().contains("API key"));
    }
}
