//! Pricing
//!
//! Decimal helpers for line prices, proration ratios and currency rounding. Every operation is
//! checked; overflow surfaces as [`PricingError::Overflow`] rather than wrapping or panicking.

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::iso::Currency;
use thiserror::Error;

/// Errors that can occur while pricing discount targets.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Decimal arithmetic overflowed.
    #[error("decimal arithmetic overflowed")]
    Overflow,
}

/// Price of `quantity` units at `unit_amount`.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: the product does not fit in a `Decimal`.
pub fn target_price(unit_amount: Decimal, quantity: i64) -> Result<Decimal, PricingError> {
    unit_amount
        .checked_mul(Decimal::from(quantity))
        .ok_or(PricingError::Overflow)
}

/// Sum a sequence of target prices.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: the running total does not fit in a `Decimal`.
pub fn total_price(prices: impl IntoIterator<Item = Decimal>) -> Result<Decimal, PricingError> {
    prices.into_iter().try_fold(Decimal::ZERO, |acc, price| {
        acc.checked_add(price).ok_or(PricingError::Overflow)
    })
}

/// Share of `total` represented by `part`, or `None` when `total` is zero.
pub fn ratio(part: Decimal, total: Decimal) -> Option<Decimal> {
    if total.is_zero() {
        return None;
    }

    part.checked_div(total)
}

/// Percentage (0-100) of the prorated share of a pool.
///
/// Computed as `(percent / 100) * pool * share` so multi-target proposals round the same way
/// regardless of how many lines they span.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: an intermediate product does not fit in a `Decimal`.
pub fn prorated_percentage(
    percent: Decimal,
    pool: Decimal,
    share: Decimal,
) -> Result<Decimal, PricingError> {
    percent
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|fraction| fraction.checked_mul(pool))
        .and_then(|amount| amount.checked_mul(share))
        .ok_or(PricingError::Overflow)
}

/// Multiply an amount by a share of the pool.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: the product does not fit in a `Decimal`.
pub fn prorated_amount(amount: Decimal, share: Decimal) -> Result<Decimal, PricingError> {
    amount.checked_mul(share).ok_or(PricingError::Overflow)
}

/// Round an amount to the currency's minor units, or normalise it when the currency is unknown.
///
/// Without a currency the full `Decimal` precision is kept, so a share that does not divide
/// evenly (e.g. 10% of three equal lines) keeps its 28-digit remainder such as
/// `0.9999999999999999999999999999`. Send `currencyCode` to get minor-unit amounts.
pub fn round_to_currency(amount: Decimal, currency: Option<&Currency>) -> Decimal {
    match currency {
        Some(currency) => amount
            .round_dp_with_strategy(currency.exponent, RoundingStrategy::MidpointAwayFromZero),
        None => amount.normalize(),
    }
}
