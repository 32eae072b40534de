//! Domain types for the claim reservation workflow.
//!
//! These types represent validated domain objects separate from database row
//! types. IDs are the core crate's newtypes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use claimstake_core::{AuctionId, ClaimId, ClaimantId, Email, RegionId};

/// An externally-sourced auction listing.
///
/// Created on the first successful claim attempt that references it and
/// refreshed on subsequent upserts; never deleted by this service.
#[derive(Debug, Clone)]
pub struct Auction {
    /// Unique auction ID.
    pub id: AuctionId,
    /// Source-assigned identifier extracted from the listing URL.
    pub external_id: String,
    /// Listing URL stripped of query string and trailing slashes.
    pub canonical_url: String,
    /// Listing title, if the source page stated one.
    pub title: Option<String>,
    /// Number of items in the listing; `None` when the page states no count.
    pub item_count: Option<i32>,
    /// Listing zip code, if extracted.
    pub zip_code: Option<String>,
    /// Whether this auction was claimed via the zero-cost trial path.
    pub is_free_claim: bool,
    /// Region the auction belongs to. Unmapped at claim time.
    pub region_id: Option<RegionId>,
    /// When the auction row was created.
    pub created_at: DateTime<Utc>,
}

/// The exclusive reservation of one [`Auction`] by one claimant.
///
/// At most one claim may ever exist per auction; the database enforces this
/// with a unique constraint on `auction_id`.
#[derive(Debug, Clone)]
pub struct Claim {
    /// Unique claim ID.
    pub id: ClaimId,
    /// The reserved auction.
    pub auction_id: AuctionId,
    /// The claimant holding the reservation.
    pub claimant_id: ClaimantId,
    /// Price computed at claim time; immutable once written.
    pub price_paid: Decimal,
    /// When the claim was committed.
    pub claimed_at: DateTime<Utc>,
}

/// A claimant account, keyed by email.
///
/// Created on first contact through the claim flow with a placeholder
/// activation token; the claimant sets a real credential through a separate
/// activation flow.
#[derive(Debug, Clone)]
pub struct Claimant {
    /// Unique claimant ID.
    pub id: ClaimantId,
    /// Claimant's email address (unique).
    pub email: Email,
    /// Current credit balance.
    pub credit_balance: i32,
    /// When the claimant was created.
    pub created_at: DateTime<Utc>,
}

/// Optional profile fields supplied with a claim request.
#[derive(Debug, Clone, Default)]
pub struct ClaimantProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Reason tag for a credit ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditReason {
    /// Signup bonus granted through the claim flow.
    SignupBonus,
}

impl CreditReason {
    /// Stable tag stored in the `credit_transaction.reason` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignupBonus => "signup_bonus",
        }
    }
}

impl std::fmt::Display for CreditReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by a successful claim reservation.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub claimant: Claimant,
    pub claim: Claim,
    pub auction: Auction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_reason_tag() {
        assert_eq!(CreditReason::SignupBonus.as_str(), "signup_bonus");
        assert_eq!(CreditReason::SignupBonus.to_string(), "signup_bonus");
    }
}
