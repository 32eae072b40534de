//! HTTP route handlers for the claim API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health            - Liveness check
//! GET  /health/ready      - Readiness check (DB ping)
//!
//! # Claims
//! POST /api/claims        - Claim an auction listing
//! POST /api/claims/check  - Availability + price quote, creates no records
//! ```

pub mod claims;

use axum::{routing::post, Router};

use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/claims", post(claims::claim))
        .route("/api/claims/check", post(claims::check))
}
