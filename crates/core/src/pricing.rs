//! Claim pricing and trial-eligibility rules.
//!
//! Pricing follows a base-plus-overage model: the base price covers up to
//! [`INCLUDED_ITEMS`] catalog items, and every item past that adds
//! [`PER_ITEM_OVERAGE`]. Listings that do not state an item count are priced
//! at the base rate.
//!
//! Both the pre-claim quote endpoint and the claim commit path call these
//! functions with the same fetched item count, so a quote and the price
//! eventually paid can never disagree.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of items covered by the base price.
pub const INCLUDED_ITEMS: i32 = 100;

/// Largest item count still eligible for a zero-cost trial claim.
pub const TRIAL_ITEM_LIMIT: i32 = 10_000;

/// Base claim price: $29.95.
#[must_use]
pub fn base_price() -> Decimal {
    Decimal::new(29_95, 2)
}

/// Overage charged per item past [`INCLUDED_ITEMS`]: $0.10.
#[must_use]
pub fn per_item_overage() -> Decimal {
    Decimal::new(10, 2)
}

/// Compute the claim price for a listing with the given item count.
///
/// `None` means the listing did not state a count; such listings are priced
/// at the base rate. Counts at or below [`INCLUDED_ITEMS`] also pay exactly
/// the base price. Anything above pays base plus per-item overage, rounded
/// half-up at the cent.
#[must_use]
pub fn compute_price(item_count: Option<i32>) -> Decimal {
    match item_count {
        Some(n) if n > INCLUDED_ITEMS => {
            let overage = Decimal::from(n - INCLUDED_ITEMS) * per_item_overage();
            (base_price() + overage)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        }
        _ => base_price(),
    }
}

/// Whether a listing qualifies for the zero-cost trial claim path.
///
/// Listings without a stated count qualify; stated counts qualify up to
/// [`TRIAL_ITEM_LIMIT`].
#[must_use]
pub fn is_trial_eligible(item_count: Option<i32>) -> bool {
    item_count.is_none_or(|n| n <= TRIAL_ITEM_LIMIT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_base_price_for_unknown_count() {
        assert_eq!(compute_price(None), dec("29.95"));
    }

    #[test]
    fn test_base_price_at_or_below_included() {
        assert_eq!(compute_price(Some(0)), dec("29.95"));
        assert_eq!(compute_price(Some(1)), dec("29.95"));
        assert_eq!(compute_price(Some(99)), dec("29.95"));
        assert_eq!(compute_price(Some(100)), dec("29.95"));
    }

    #[test]
    fn test_overage_pricing() {
        assert_eq!(compute_price(Some(101)), dec("30.05"));
        assert_eq!(compute_price(Some(250)), dec("44.95"));
        assert_eq!(compute_price(Some(300)), dec("49.95"));
        assert_eq!(compute_price(Some(1100)), dec("129.95"));
    }

    #[test]
    fn test_price_is_two_decimal_places() {
        for n in [None, Some(50), Some(101), Some(250), Some(99_999)] {
            assert!(compute_price(n).scale() <= 2, "price for {n:?} not in cents");
        }
    }

    #[test]
    fn test_deterministic() {
        // Quote path and claim path call this with the same input; they must
        // always agree.
        for n in [None, Some(1), Some(100), Some(101), Some(300), Some(12_345)] {
            assert_eq!(compute_price(n), compute_price(n));
        }
    }

    #[test]
    fn test_trial_eligibility() {
        assert!(is_trial_eligible(None));
        assert!(is_trial_eligible(Some(0)));
        assert!(is_trial_eligible(Some(10_000)));
        assert!(!is_trial_eligible(Some(10_001)));
        assert!(!is_trial_eligible(Some(50_000)));
    }

    #[test]
    fn test_trial_eligibility_independent_of_price() {
        // A listing can be trial-eligible while still carrying an overage
        // price for the paid path.
        assert!(is_trial_eligible(Some(300)));
        assert_eq!(compute_price(Some(300)), dec("49.95"));
    }
}
