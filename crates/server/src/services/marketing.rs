//! Marketing platform client for claimant tagging.
//!
//! After a successful claim the claimant is subscribed to the configured
//! marketing list and tagged with the auction they claimed. This is a
//! fire-and-forget collaborator: failures are logged and never fail the
//! claim.
//!
//! When no marketing credentials are configured the client is constructed in
//! an explicit `Disabled` state and logs one warning at startup; call sites
//! do not null-check credentials.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use claimstake_core::Email;

use crate::config::MarketingConfig;

/// Marketing API version.
const API_REVISION: &str = "2024-10-15";

/// Marketing API base URL.
const BASE_URL: &str = "https://a.klaviyo.com/api";

/// Errors that can occur when talking to the marketing API.
#[derive(Debug, Error)]
pub enum MarketingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client construction failed.
    #[error("client error: {0}")]
    Client(String),
}

/// Marketing client, enabled or explicitly disabled.
#[derive(Clone)]
pub enum MarketingClient {
    Enabled(ApiClient),
    Disabled,
}

impl MarketingClient {
    /// Build a client from optional configuration.
    ///
    /// `None` produces the `Disabled` state with a logged warning;
    /// tagging calls then succeed as no-ops.
    ///
    /// # Errors
    ///
    /// Returns `MarketingError::Client` if the HTTP client fails to build.
    pub fn from_config(config: Option<&MarketingConfig>) -> Result<Self, MarketingError> {
        match config {
            Some(config) => Ok(Self::Enabled(ApiClient::new(config)?)),
            None => {
                tracing::warn!(
                    "marketing credentials not configured; claimant tagging is disabled"
                );
                Ok(Self::Disabled)
            }
        }
    }

    /// Subscribe a claimant to the list and tag them with the claimed
    /// auction.
    ///
    /// # Errors
    ///
    /// Returns `MarketingError` if the API request fails. No-op when
    /// disabled.
    pub async fn tag_claimant(
        &self,
        email: &Email,
        external_id: &str,
    ) -> Result<(), MarketingError> {
        match self {
            Self::Enabled(client) => client.tag_claimant(email, external_id).await,
            Self::Disabled => Ok(()),
        }
    }

    /// Whether tagging is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }
}

/// The live marketing API client.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    list_id: String,
}

impl ApiClient {
    fn new(config: &MarketingConfig) -> Result<Self, MarketingError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Klaviyo-API-Key {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| MarketingError::Client(format!("invalid API key format: {e}")))?,
        );
        headers.insert("revision", HeaderValue::from_static(API_REVISION));
        headers.insert(
            "Content-Type",
            HeaderValue::from_static("application/vnd.api+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            list_id: config.list_id.clone(),
        })
    }

    async fn tag_claimant(&self, email: &Email, external_id: &str) -> Result<(), MarketingError> {
        let url = format!("{BASE_URL}/profile-subscription-bulk-create-jobs");

        let body = serde_json::json!({
            "data": {
                "type": "profile-subscription-bulk-create-job",
                "attributes": {
                    "custom_source": "Claimstake Claim Flow",
                    "profiles": {
                        "data": [{
                            "type": "profile",
                            "attributes": {
                                "email": email.as_str(),
                                "properties": {
                                    "last_claimed_auction": external_id
                                },
                                "subscriptions": {
                                    "email": {
                                        "marketing": {
                                            "consent": "SUBSCRIBED"
                                        }
                                    }
                                }
                            }
                        }]
                    }
                },
                "relationships": {
                    "list": {
                        "data": {
                            "type": "list",
                            "id": self.list_id
                        }
                    }
                }
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        // 202 Accepted is the expected response for bulk jobs
        if !status.is_success() && status.as_u16() != 202 {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_client_is_a_noop() {
        let client = MarketingClient::from_config(None).unwrap();
        assert!(!client.is_enabled());

        let email = Email::parse("bidder@example.com").unwrap();
        assert!(client.tag_claimant(&email, "42000").await.is_ok());
    }

    #[test]
    fn test_enabled_client_from_config() {
        let config = MarketingConfig {
            api_key: secrecy::SecretString::from("pk_aB3xY9mK2nL5pQ7rT0uW4zC6"),
            list_id: "XyZ123".to_string(),
        };
        let client = MarketingClient::from_config(Some(&config)).unwrap();
        assert!(client.is_enabled());
    }
}
