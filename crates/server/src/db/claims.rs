//! Claim repository: availability lookups and the reservation transaction.
//!
//! The reservation is the one write path with a real correctness invariant:
//! at most one claim may ever exist per auction. That invariant is carried by
//! the unique constraint on `claim.auction_id`, not by a read-then-write
//! check; of two racing transactions, the second insert fails and is
//! translated to [`RepositoryError::Conflict`].

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use claimstake_core::{AuctionId, ClaimId, ClaimantId, Email, RegionId};

use super::RepositoryError;
use crate::listing::ListingMeta;
use crate::models::{Auction, Claim, Claimant, ClaimantProfile, ClaimOutcome, CreditReason};

/// Credits granted to a claimant at claim time.
pub const SIGNUP_CREDITS: i32 = 1;

/// Everything the reservation transaction needs, computed before it opens.
///
/// The listing fetch and price computation happen outside the transaction so
/// no locks are held across external latency.
pub struct ReserveClaim<'a> {
    pub email: &'a Email,
    pub profile: &'a ClaimantProfile,
    pub external_id: &'a str,
    pub canonical_url: &'a str,
    pub meta: &'a ListingMeta,
    pub price: Decimal,
    pub is_free_claim: bool,
    /// Placeholder credential for a newly created claimant; replaced through
    /// the separate activation flow.
    pub activation_token: &'a str,
}

/// Repository for claim and auction database operations.
pub struct ClaimRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ClaimRepository<'a> {
    /// Create a new claim repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up the claim holding the auction with the given external id.
    ///
    /// Used by the pre-claim check endpoint and as an optimistic fast
    /// rejection before the expensive listing fetch. It is not the
    /// concurrency control; that is the unique constraint in [`reserve`].
    ///
    /// [`reserve`]: Self::reserve
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_active_claim(
        &self,
        external_id: &str,
    ) -> Result<Option<Claim>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT c.id, c.auction_id, c.claimant_id, c.price_paid, c.claimed_at
            FROM claimstake.claim c
            JOIN claimstake.auction a ON a.id = c.auction_id
            WHERE a.external_id = $1
            ",
        )
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| claim_from_row(&r)).transpose()
    }

    /// Atomically reserve an auction for a claimant.
    ///
    /// Single transaction: find-or-create the claimant (with signup credits
    /// and a placeholder activation token on create), upsert the auction by
    /// external id, insert the claim, and append the signup-bonus ledger
    /// entry. Any failure rolls the whole transaction back; the auction
    /// upsert is the only state a later retry may observe from a failed
    /// attempt, and it is idempotent by key.
    ///
    /// Every write in here tolerates a concurrent duplicate: the claimant
    /// insert is `ON CONFLICT DO NOTHING`, the auction insert upserts, and a
    /// unique violation anywhere maps to [`RepositoryError::Conflict`] rather
    /// than surfacing as a plain database error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the auction is already claimed
    /// (unique violation on `claim.auction_id`).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn reserve(&self, req: &ReserveClaim<'_>) -> Result<ClaimOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Find-or-create the claimant by email, insert-first so two racing
        // first claims from one new email both proceed. The loser's insert
        // returns no row once the winner commits; it falls through to the
        // select and skips the signup-credit initialization. The claim
        // insert below then decides which attempt wins the auction.
        let inserted = sqlx::query(
            r"
            INSERT INTO claimstake.claimant
                (email, first_name, last_name, phone, credit_balance, activation_token)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, credit_balance, created_at
            ",
        )
        .bind(req.email.as_str())
        .bind(req.profile.first_name.as_deref())
        .bind(req.profile.last_name.as_deref())
        .bind(req.profile.phone.as_deref())
        .bind(SIGNUP_CREDITS)
        .bind(req.activation_token)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique_violation(e, "claimant already exists"))?;

        let claimant = match inserted {
            Some(row) => claimant_from_row(&row)?,
            None => {
                let row = sqlx::query(
                    r"
                    SELECT id, email, credit_balance, created_at
                    FROM claimstake.claimant
                    WHERE email = $1
                    ",
                )
                .bind(req.email.as_str())
                .fetch_one(&mut *tx)
                .await?;
                claimant_from_row(&row)?
            }
        };

        // Upsert the auction by external id: created if absent, metadata
        // refreshed if present. Keyed by a unique column, so a retry after a
        // failed earlier attempt lands on the same row.
        //
        // TODO: derive region_id from the listing zip code once the county
        // lookup table lands; NULL until then.
        let auction_row = sqlx::query(
            r"
            INSERT INTO claimstake.auction
                (external_id, canonical_url, title, item_count, zip_code, is_free_claim)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_id) DO UPDATE SET
                canonical_url = EXCLUDED.canonical_url,
                title = EXCLUDED.title,
                item_count = EXCLUDED.item_count,
                zip_code = EXCLUDED.zip_code,
                is_free_claim = EXCLUDED.is_free_claim,
                updated_at = now()
            RETURNING id, external_id, canonical_url, title, item_count, zip_code,
                      is_free_claim, region_id, created_at
            ",
        )
        .bind(req.external_id)
        .bind(req.canonical_url)
        .bind(req.meta.title.as_deref())
        .bind(req.meta.item_count)
        .bind(req.meta.zip_code.as_deref())
        .bind(req.is_free_claim)
        .fetch_one(&mut *tx)
        .await?;
        let auction = auction_from_row(&auction_row)?;

        // The unique constraint on claim.auction_id is the concurrency
        // control: of two racing transactions, the second insert fails here
        // and the whole transaction rolls back.
        let claim_row = sqlx::query(
            r"
            INSERT INTO claimstake.claim (auction_id, claimant_id, price_paid)
            VALUES ($1, $2, $3)
            RETURNING id, auction_id, claimant_id, price_paid, claimed_at
            ",
        )
        .bind(auction.id)
        .bind(claimant.id)
        .bind(req.price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique_violation(e, "auction already claimed"))?;
        let claim = claim_from_row(&claim_row)?;

        // Signup-bonus ledger entry, written whether or not the claimant was
        // created above.
        sqlx::query(
            r"
            INSERT INTO claimstake.credit_transaction (claimant_id, amount, reason, auction_id)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(claimant.id)
        .bind(SIGNUP_CREDITS)
        .bind(CreditReason::SignupBonus.as_str())
        .bind(auction.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ClaimOutcome {
            claimant,
            claim,
            auction,
        })
    }
}

/// Translate a unique-constraint violation into [`RepositoryError::Conflict`].
///
/// Applied to every insert in the reservation transaction so a race lost to
/// a concurrent request surfaces as a conflict, never as a plain database
/// error.
fn conflict_on_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

fn claim_from_row(row: &PgRow) -> Result<Claim, RepositoryError> {
    Ok(Claim {
        id: ClaimId::new(row.try_get("id")?),
        auction_id: AuctionId::new(row.try_get("auction_id")?),
        claimant_id: ClaimantId::new(row.try_get("claimant_id")?),
        price_paid: row.try_get("price_paid")?,
        claimed_at: row.try_get("claimed_at")?,
    })
}

fn claimant_from_row(row: &PgRow) -> Result<Claimant, RepositoryError> {
    let email: String = row.try_get("email")?;
    let email = Email::parse(&email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;

    Ok(Claimant {
        id: ClaimantId::new(row.try_get("id")?),
        email,
        credit_balance: row.try_get("credit_balance")?,
        created_at: row.try_get("created_at")?,
    })
}

fn auction_from_row(row: &PgRow) -> Result<Auction, RepositoryError> {
    Ok(Auction {
        id: AuctionId::new(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        canonical_url: row.try_get("canonical_url")?,
        title: row.try_get("title")?,
        item_count: row.try_get("item_count")?,
        zip_code: row.try_get("zip_code")?,
        is_free_claim: row.try_get("is_free_claim")?,
        region_id: row
            .try_get::<Option<i32>, _>("region_id")?
            .map(RegionId::new),
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StubDbError {
        unique: bool,
    }

    impl std::fmt::Display for StubDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }
    }

    fn db_error(unique: bool) -> sqlx::Error {
        sqlx::Error::Database(Box::new(StubDbError { unique }))
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        // Losing a race on claimant.email or claim.auction_id must surface
        // as a conflict, not a storage failure.
        let err = conflict_on_unique_violation(db_error(true), "claimant already exists");
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg == "claimant already exists"));

        let err = conflict_on_unique_violation(db_error(true), "auction already claimed");
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg == "auction already claimed"));
    }

    #[test]
    fn test_other_database_errors_pass_through() {
        let err = conflict_on_unique_violation(db_error(false), "claimant already exists");
        assert!(matches!(err, RepositoryError::Database(_)));
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = conflict_on_unique_violation(sqlx::Error::RowNotFound, "auction already claimed");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
