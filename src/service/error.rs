// service/error.rs
use axum::http::StatusCode;
use thiserror::Error;

use crate::error::HttpError;

/// Stable error kinds for the deal/offer/chat core. Guard failures are
/// never collapsed into a generic failure: clients branch on them.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You are not allowed to perform this action on this deal")]
    Forbidden,

    #[error("Cannot {action} while the deal is in status '{current}'")]
    InvalidState {
        current: String,
        action: &'static str,
    },

    #[error("You have already signed this contract")]
    AlreadySigned,

    #[error("No signing code was requested. Request a code first")]
    NoPendingCode,

    #[error("The signing code does not match")]
    CodeMismatch,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl ServiceError {
    pub fn invalid_state(current: impl Into<String>, action: &'static str) -> Self {
        ServiceError::InvalidState {
            current: current.into(),
            action,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Forbidden => StatusCode::FORBIDDEN,

            ServiceError::InvalidState { .. }
            | ServiceError::AlreadySigned
            | ServiceError::NoPendingCode
            | ServiceError::CodeMismatch
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,

            ServiceError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        HttpError::new(error.to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_failures_map_to_distinct_http_statuses() {
        assert_eq!(ServiceError::NotFound("Deal").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::invalid_state("completed", "submit work").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::DependencyUnavailable("storage".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn invalid_state_message_names_the_current_state() {
        let err = ServiceError::invalid_state("work_submitted", "pay");
        let msg = err.to_string();
        assert!(msg.contains("work_submitted"));
        assert!(msg.contains("pay"));
    }
}
