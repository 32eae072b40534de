//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::listing::{FetchError, HibidFetcher, ListingFetcher};
use crate::services::marketing::{MarketingClient, MarketingError};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build listing fetcher: {0}")]
    Fetcher(#[from] FetchError),
    #[error("failed to build marketing client: {0}")]
    Marketing(#[from] MarketingError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: PgPool,
    fetcher: Arc<dyn ListingFetcher>,
    marketing: MarketingClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fetcher or marketing client cannot be
    /// built.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, StateError> {
        let fetcher = HibidFetcher::new(config.fetch_timeout)?;
        let marketing = MarketingClient::from_config(config.marketing.as_ref())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                fetcher: Arc::new(fetcher),
                marketing,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the listing fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &dyn ListingFetcher {
        self.inner.fetcher.as_ref()
    }

    /// Get a reference to the marketing client.
    #[must_use]
    pub fn marketing(&self) -> &MarketingClient {
        &self.inner.marketing
    }
}
