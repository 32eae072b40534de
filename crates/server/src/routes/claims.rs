//! Claim submission and pre-claim check route handlers.

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use claimstake_core::Email;

use crate::error::{AppError, Result};
use crate::models::ClaimantProfile;
use crate::services::{Availability, ClaimCommand, ClaimService};
use crate::state::AppState;

/// Claim submission request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub url: String,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Request the zero-cost trial path.
    #[serde(default)]
    pub free_claim: bool,
}

/// Claim submission response body.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub data: ClaimData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    pub auction_id: i32,
    pub user_email: String,
    /// Serialized as a JSON number; existing clients expect `49.95`, not
    /// `"49.95"`.
    #[serde(with = "rust_decimal::serde::float")]
    pub price_paid: Decimal,
}

/// Pre-claim check request body.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub url: String,
}

/// Pre-claim check response body.
#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum CheckResponse {
    /// The auction is already claimed.
    #[serde(rename = "LOCKED")]
    Locked,
    /// The auction can be claimed at the quoted price.
    #[serde(rename = "AVAILABLE")]
    #[serde(rename_all = "camelCase")]
    Available {
        #[serde(with = "rust_decimal::serde::float")]
        price: Decimal,
        trial_eligible: bool,
    },
}

/// Claim an auction listing.
///
/// Resolves the URL, fetches current listing metadata, prices the claim, and
/// atomically reserves the auction for the claimant. Exactly one of any set
/// of concurrent requests for the same listing succeeds; the rest get 409.
#[instrument(skip(state, request), fields(url = %request.url))]
pub async fn claim(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>> {
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

    let command = ClaimCommand {
        url: request.url,
        email,
        profile: ClaimantProfile {
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
        },
        free_claim: request.free_claim,
    };

    let service = ClaimService::new(state.pool(), state.fetcher());
    let outcome = service.claim(&command).await?;

    // Tagging is best-effort; a marketing outage must not fail the claim.
    if let Err(e) = state
        .marketing()
        .tag_claimant(&outcome.claimant.email, &outcome.auction.external_id)
        .await
    {
        tracing::warn!(
            error = %e,
            external_id = %outcome.auction.external_id,
            "marketing tagging failed after claim"
        );
    }

    Ok(Json(ClaimResponse {
        success: true,
        data: ClaimData {
            auction_id: outcome.auction.id.as_i32(),
            user_email: outcome.claimant.email.into_inner(),
            price_paid: outcome.claim.price_paid,
        },
    }))
}

/// Check availability of an auction listing and quote its price.
///
/// Creates no records. The quote uses the same pricing rules as the claim
/// path, so a quoted price never disagrees with the price paid.
#[instrument(skip(state, request), fields(url = %request.url))]
pub async fn check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<CheckResponse>> {
    let service = ClaimService::new(state.pool(), state.fetcher());

    let response = match service.check(&request.url).await? {
        Availability::Locked => CheckResponse::Locked,
        Availability::Available {
            price,
            trial_eligible,
        } => CheckResponse::Available {
            price,
            trial_eligible,
        },
    };

    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_request_accepts_minimal_body() {
        let request: ClaimRequest = serde_json::from_str(
            r#"{"url": "https://hibid.com/lot/42000?x=y", "email": "bidder@example.com"}"#,
        )
        .unwrap();
        assert_eq!(request.url, "https://hibid.com/lot/42000?x=y");
        assert!(!request.free_claim);
        assert!(request.first_name.is_none());
    }

    #[test]
    fn test_claim_request_camel_case_fields() {
        let request: ClaimRequest = serde_json::from_str(
            r#"{
                "url": "https://hibid.com/lot/42000",
                "email": "bidder@example.com",
                "firstName": "Jo",
                "lastName": "Bidder",
                "freeClaim": true
            }"#,
        )
        .unwrap();
        assert_eq!(request.first_name.as_deref(), Some("Jo"));
        assert_eq!(request.last_name.as_deref(), Some("Bidder"));
        assert!(request.free_claim);
    }

    #[test]
    fn test_check_response_locked_shape() {
        let json = serde_json::to_value(CheckResponse::Locked).unwrap();
        assert_eq!(json, serde_json::json!({"status": "LOCKED"}));
    }

    #[test]
    fn test_check_response_available_shape() {
        let json = serde_json::to_value(CheckResponse::Available {
            price: "49.95".parse().unwrap(),
            trial_eligible: true,
        })
        .unwrap();
        assert_eq!(json["status"], "AVAILABLE");
        // Prices go over the wire as numbers.
        assert_eq!(json["price"], serde_json::json!(49.95));
        assert_eq!(json["trialEligible"], true);
    }

    #[test]
    fn test_claim_response_shape() {
        let response = ClaimResponse {
            success: true,
            data: ClaimData {
                auction_id: 7,
                user_email: "bidder@example.com".to_string(),
                price_paid: "49.95".parse().unwrap(),
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["auctionId"], 7);
        assert_eq!(json["data"]["userEmail"], "bidder@example.com");
        assert_eq!(json["data"]["pricePaid"], serde_json::json!(49.95));
    }
}
