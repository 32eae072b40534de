//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Expected workflow failures (bad URLs, fetch failures, claimed auctions)
//! get safe descriptive messages; storage failures are logged with full
//! detail server-side and surfaced only as a generic failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ClaimError;

/// Application-level error type for the claim API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Claim workflow failure.
    #[error("claim error: {0}")]
    Claim(#[from] ClaimError),

    /// Database operation failed outside the claim workflow.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Claim(ClaimError::Persistence(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Claim(err) => match err {
                ClaimError::InvalidUrl
                | ClaimError::IdentifierExtraction
                | ClaimError::FetchFailed(_)
                | ClaimError::TrialIneligible => StatusCode::BAD_REQUEST,
                // Stricter than the legacy API's 400: a claimed auction is a
                // conflict, not a malformed request.
                ClaimError::AlreadyClaimed => StatusCode::CONFLICT,
                ClaimError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-safe message. Never exposes internal error detail, and never
    /// reveals who holds an existing claim.
    fn message(&self) -> String {
        match self {
            Self::Claim(err) => match err {
                ClaimError::Persistence(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = serde_json::json!({
            "success": false,
            "message": self.message(),
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::FetchError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_claim_error_status_codes() {
        assert_eq!(
            get_status(AppError::Claim(ClaimError::InvalidUrl)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Claim(ClaimError::IdentifierExtraction)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Claim(ClaimError::FetchFailed(
                FetchError::Status(503)
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Claim(ClaimError::TrialIneligible)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Claim(ClaimError::AlreadyClaimed)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_server_error_status_codes() {
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Claim(ClaimError::Persistence(
                RepositoryError::NotFound
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Internal("connection pool exhausted at 10.0.0.3".to_string());
        assert_eq!(err.message(), "Internal server error");

        let err = AppError::Claim(ClaimError::Persistence(RepositoryError::DataCorruption(
            "bad row 17".to_string(),
        )));
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_already_claimed_message_names_no_claimant() {
        let msg = AppError::Claim(ClaimError::AlreadyClaimed).message();
        assert_eq!(msg, "auction is already claimed");
    }
}
