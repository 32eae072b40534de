//! Database operations for the claim store.
//!
//! # Schema: `claimstake`
//!
//! ## Tables
//!
//! - `region` - Grouping entity for auctions (populated by ops tooling)
//! - `claimant` - Accounts keyed by email, with a credit balance
//! - `auction` - Externally-sourced listings, keyed by external id
//! - `claim` - Exclusive reservations, one per auction
//! - `credit_transaction` - Append-only credit ledger
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p claimstake-cli -- migrate
//! ```
//! They are never run automatically at server startup.

pub mod claims;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use claims::ClaimRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., an auction already claimed).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// The pool is created once in `main` and threaded through `AppState`; no
/// per-request clients.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
