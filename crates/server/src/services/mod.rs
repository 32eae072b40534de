//! Business services for the claim workflow.

pub mod claims;
pub mod marketing;

pub use claims::{Availability, ClaimCommand, ClaimError, ClaimService};
pub use marketing::MarketingClient;
