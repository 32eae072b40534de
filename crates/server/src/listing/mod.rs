//! Listing URL identity and metadata.
//!
//! [`resolver`] turns an auction listing URL into a canonical external
//! identifier and decides whether the URL is from a trusted source at all.
//! [`fetcher`] retrieves the listing page and extracts its metadata.

pub mod fetcher;
pub mod resolver;

pub use fetcher::{FetchError, HibidFetcher, ListingFetcher, ListingMeta};
