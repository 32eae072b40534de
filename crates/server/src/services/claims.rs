//! Claim reservation workflow.
//!
//! Per request: resolve the URL to an external id, optimistically check
//! availability, fetch current listing metadata, compute the price, then
//! commit the reservation in a single transaction. Steps before the commit
//! run outside any transaction; the listing fetch in particular may block on
//! external network latency and must never hold locks.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use claimstake_core::{pricing, Email};

use crate::db::claims::{ClaimRepository, ReserveClaim};
use crate::db::RepositoryError;
use crate::listing::{resolver, FetchError, ListingFetcher, ListingMeta};
use crate::models::{ClaimantProfile, ClaimOutcome};

/// Length of the placeholder activation token for new claimants.
const ACTIVATION_TOKEN_LEN: usize = 32;

/// Errors produced by the claim workflow.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The URL is malformed or not from a trusted auction source.
    #[error("not a recognized auction listing URL")]
    InvalidUrl,

    /// The URL is from a trusted source but carries no extractable listing id.
    #[error("could not find a listing id in the URL")]
    IdentifierExtraction,

    /// The listing page could not be fetched or interpreted.
    #[error("could not read the auction listing")]
    FetchFailed(#[source] FetchError),

    /// The auction is already reserved by a claimant.
    #[error("auction is already claimed")]
    AlreadyClaimed,

    /// A free trial claim was requested for an ineligible listing.
    #[error("listing is not eligible for a free claim")]
    TrialIneligible,

    /// Unexpected storage failure.
    #[error("storage error")]
    Persistence(#[source] RepositoryError),
}

impl From<RepositoryError> for ClaimError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::AlreadyClaimed,
            other => Self::Persistence(other),
        }
    }
}

/// A claim request after request-level validation.
#[derive(Debug, Clone)]
pub struct ClaimCommand {
    pub url: String,
    pub email: Email,
    pub profile: ClaimantProfile,
    /// Request the zero-cost trial path instead of the paid claim.
    pub free_claim: bool,
}

/// Result of a pre-claim availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// The auction is already claimed.
    Locked,
    /// The auction is free to claim at the quoted price.
    Available {
        price: Decimal,
        trial_eligible: bool,
    },
}

/// URL resolved to its source identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedListing {
    pub external_id: String,
    pub canonical_url: String,
}

/// Resolve a listing URL: allow-list check, then identifier extraction.
///
/// # Errors
///
/// `InvalidUrl` if the URL fails the allow-list; `IdentifierExtraction` if
/// no listing id can be found in it.
pub fn resolve(url: &str) -> Result<ResolvedListing, ClaimError> {
    if !resolver::is_allowed_url(url) {
        return Err(ClaimError::InvalidUrl);
    }
    let external_id =
        resolver::extract_external_id(url).ok_or(ClaimError::IdentifierExtraction)?;
    Ok(ResolvedListing {
        external_id,
        canonical_url: resolver::canonicalize(url),
    })
}

/// Fetch listing metadata through the collaborator, mapping failures.
///
/// # Errors
///
/// `FetchFailed` for any fetch error, timeouts included. Not retried here.
pub async fn fetch_listing(
    fetcher: &dyn ListingFetcher,
    url: &str,
) -> Result<ListingMeta, ClaimError> {
    fetcher.fetch(url).await.map_err(ClaimError::FetchFailed)
}

/// Price the claim, applying the free-trial policy when requested.
///
/// Returns the price to charge and whether this is a free claim.
///
/// # Errors
///
/// `TrialIneligible` when a free claim is requested for a listing whose item
/// count exceeds the trial limit.
pub fn price_claim(meta: &ListingMeta, free_claim: bool) -> Result<(Decimal, bool), ClaimError> {
    if free_claim {
        if !pricing::is_trial_eligible(meta.item_count) {
            return Err(ClaimError::TrialIneligible);
        }
        return Ok((Decimal::ZERO, true));
    }
    Ok((pricing::compute_price(meta.item_count), false))
}

/// The claim workflow over a pool and a listing fetcher.
pub struct ClaimService<'a> {
    pool: &'a PgPool,
    fetcher: &'a dyn ListingFetcher,
}

impl<'a> ClaimService<'a> {
    /// Create a new claim service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, fetcher: &'a dyn ListingFetcher) -> Self {
        Self { pool, fetcher }
    }

    /// Check whether the auction behind `url` is claimable, and quote it.
    ///
    /// Creates no records.
    ///
    /// # Errors
    ///
    /// `InvalidUrl` / `IdentifierExtraction` for unusable URLs,
    /// `FetchFailed` if the listing cannot be read, `Persistence` on storage
    /// failure.
    pub async fn check(&self, url: &str) -> Result<Availability, ClaimError> {
        let resolved = resolve(url)?;

        let repo = ClaimRepository::new(self.pool);
        if repo.find_active_claim(&resolved.external_id).await?.is_some() {
            return Ok(Availability::Locked);
        }

        let meta = fetch_listing(self.fetcher, url).await?;
        Ok(Availability::Available {
            price: pricing::compute_price(meta.item_count),
            trial_eligible: pricing::is_trial_eligible(meta.item_count),
        })
    }

    /// Run the full claim workflow for one request.
    ///
    /// # Errors
    ///
    /// Any [`ClaimError`]; `AlreadyClaimed` is reported both from the
    /// optimistic pre-check and from the transactional insert.
    pub async fn claim(&self, command: &ClaimCommand) -> Result<ClaimOutcome, ClaimError> {
        let resolved = resolve(&command.url)?;
        let repo = ClaimRepository::new(self.pool);

        // Optimistic fast rejection before the expensive fetch. The
        // authoritative check is the constraint-backed insert in reserve().
        if repo.find_active_claim(&resolved.external_id).await?.is_some() {
            return Err(ClaimError::AlreadyClaimed);
        }

        let meta = fetch_listing(self.fetcher, &command.url).await?;
        let (price, is_free_claim) = price_claim(&meta, command.free_claim)?;

        let activation_token = generate_activation_token();
        let outcome = repo
            .reserve(&ReserveClaim {
                email: &command.email,
                profile: &command.profile,
                external_id: &resolved.external_id,
                canonical_url: &resolved.canonical_url,
                meta: &meta,
                price,
                is_free_claim,
                activation_token: &activation_token,
            })
            .await?;

        tracing::info!(
            auction_id = %outcome.auction.id,
            external_id = %outcome.auction.external_id,
            claimant_id = %outcome.claimant.id,
            price = %outcome.claim.price_paid,
            free_claim = is_free_claim,
            "claim reserved"
        );

        Ok(outcome)
    }
}

/// Generate a placeholder activation token for a newly created claimant.
///
/// The claimant sets a real credential through the activation flow; this
/// token only has to be unguessable until then.
fn generate_activation_token() -> String {
    use rand::Rng;

    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(ACTIVATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    /// Fetcher returning a fixed result, for exercising the workflow without
    /// a network.
    struct MockFetcher {
        result: Result<ListingMeta, ()>,
    }

    impl MockFetcher {
        fn with_count(item_count: Option<i32>) -> Self {
            Self {
                result: Ok(ListingMeta {
                    item_count,
                    ..ListingMeta::default()
                }),
            }
        }

        fn failing() -> Self {
            Self { result: Err(()) }
        }
    }

    #[async_trait]
    impl ListingFetcher for MockFetcher {
        async fn fetch(&self, _url: &str) -> Result<ListingMeta, FetchError> {
            match &self.result {
                Ok(meta) => Ok(meta.clone()),
                Err(()) => Err(FetchError::Status(503)),
            }
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_disallowed_url() {
        assert!(matches!(
            resolve("https://example.com/lot/42"),
            Err(ClaimError::InvalidUrl)
        ));
    }

    #[test]
    fn test_resolve_allowed_url() {
        let resolved = resolve("https://x.hibid.com/lot/555?ref=1").unwrap();
        assert_eq!(resolved.external_id, "555");
        assert_eq!(resolved.canonical_url, "https://x.hibid.com/lot/555");
    }

    #[test]
    fn test_resolve_agrees_across_url_spellings() {
        let a = resolve("https://x.hibid.com/lot/555?ref=1").unwrap();
        let b = resolve("https://x.hibid.com/lot/555/").unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_fetch_listing_maps_failure() {
        let fetcher = MockFetcher::failing();
        let err = fetch_listing(&fetcher, "https://hibid.com/lot/1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_listing_passes_meta_through() {
        let fetcher = MockFetcher::with_count(Some(300));
        let meta = fetch_listing(&fetcher, "https://hibid.com/lot/1")
            .await
            .unwrap();
        assert_eq!(meta.item_count, Some(300));
    }

    #[test]
    fn test_price_claim_paid_path() {
        let meta = ListingMeta {
            item_count: Some(300),
            ..ListingMeta::default()
        };
        let (price, free) = price_claim(&meta, false).unwrap();
        assert_eq!(price, dec("49.95"));
        assert!(!free);
    }

    #[test]
    fn test_price_claim_unknown_count() {
        let (price, free) = price_claim(&ListingMeta::default(), false).unwrap();
        assert_eq!(price, dec("29.95"));
        assert!(!free);
    }

    #[test]
    fn test_price_claim_free_path() {
        let meta = ListingMeta {
            item_count: Some(300),
            ..ListingMeta::default()
        };
        let (price, free) = price_claim(&meta, true).unwrap();
        assert_eq!(price, Decimal::ZERO);
        assert!(free);
    }

    #[test]
    fn test_price_claim_free_path_ineligible() {
        let meta = ListingMeta {
            item_count: Some(10_001),
            ..ListingMeta::default()
        };
        assert!(matches!(
            price_claim(&meta, true),
            Err(ClaimError::TrialIneligible)
        ));
    }

    #[test]
    fn test_conflict_maps_to_already_claimed() {
        let err: ClaimError = RepositoryError::Conflict("auction already claimed".into()).into();
        assert!(matches!(err, ClaimError::AlreadyClaimed));

        let err: ClaimError = RepositoryError::NotFound.into();
        assert!(matches!(err, ClaimError::Persistence(_)));
    }

    #[test]
    fn test_activation_token_shape() {
        let token = generate_activation_token();
        assert_eq!(token.len(), ACTIVATION_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_activation_token());
    }
}
