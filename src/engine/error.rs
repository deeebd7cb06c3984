use actix_web::{HttpResponse, http::StatusCode};

use super::types::LeaveType;

/// Error taxonomy of the transition engine. Every operation fails with one
/// of these before any partial effect is visible; storage-level failures are
/// erased into `Storage` and roll the surrounding transaction back.
#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("insufficient {kind} balance: {available} day(s) available, {requested} requested")]
    InsufficientBalance {
        kind: LeaveType,
        available: i64,
        requested: i64,
    },
    #[error("the requested dates overlap an existing leave request")]
    Conflict,
    #[error("the self-service cancellation window has expired")]
    WindowExpired,
    #[error("leave has already started and cannot be self-cancelled")]
    AlreadyStarted,
    #[error("balance integrity check failed: {0}")]
    Integrity(String),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for LeaveError {
    fn from(err: sqlx::Error) -> Self {
        LeaveError::Storage(anyhow::Error::new(err))
    }
}

impl actix_web::ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Validation(_)
            | LeaveError::InvalidState(_)
            | LeaveError::InsufficientBalance { .. }
            | LeaveError::Conflict
            | LeaveError::WindowExpired
            | LeaveError::AlreadyStarted => StatusCode::BAD_REQUEST,
            LeaveError::Integrity(_) | LeaveError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal detail stays in the logs, not in the response body.
        let message = match self {
            LeaveError::Integrity(_) | LeaveError::Storage(_) => {
                tracing::error!(error = %self, "internal failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "message": message }))
    }
}
