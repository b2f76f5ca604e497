//! Discount Fixtures

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::Deserialize;

use crate::{
    discounts::{CartLineTarget, Discount, DiscountProposal, ProposalValue},
    fixtures::{FixtureError, cart::parse_price},
};

/// Wrapper for discounts in YAML
#[derive(Debug, Deserialize)]
pub struct DiscountsFixture {
    /// Discounts in evaluation order
    #[serde(default)]
    pub discounts: Vec<DiscountFixture>,
}

/// Discount Fixture
#[derive(Debug, Deserialize)]
pub struct DiscountFixture {
    /// Discount id
    pub id: String,

    /// Proposals put forward by the discount
    #[serde(default)]
    pub proposals: Vec<ProposalFixture>,
}

/// Proposal Fixture
#[derive(Debug, Deserialize)]
pub struct ProposalFixture {
    /// Proposal handle
    pub handle: String,

    /// Value, e.g. "15%", "10.00 USD" or "5.00 USD each"
    pub value: String,

    /// Targeted lines
    pub targets: Vec<TargetFixture>,
}

/// Target Fixture
#[derive(Debug, Deserialize)]
pub struct TargetFixture {
    /// Cart line id
    pub line: String,

    /// Units targeted; defaults to the whole line
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl DiscountFixture {
    /// Convert to a `Discount`, resolving omitted target quantities through `line_quantity`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed, a fixed amount is in another currency, or a
    /// target line cannot be found.
    pub fn try_into_discount(
        self,
        currency: &'static Currency,
        line_quantity: impl Fn(&str) -> Result<i64, FixtureError>,
    ) -> Result<Discount, FixtureError> {
        let proposals = self
            .proposals
            .into_iter()
            .map(|proposal| -> Result<DiscountProposal, FixtureError> {
                let value = parse_value(&proposal.value, currency)?;

                let targets = proposal
                    .targets
                    .into_iter()
                    .map(|target| -> Result<CartLineTarget, FixtureError> {
                        let available = line_quantity(&target.line)?;

                        Ok(CartLineTarget::new(
                            target.line,
                            target.quantity.unwrap_or(available),
                        ))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(DiscountProposal::new(proposal.handle, targets, value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Discount::new(self.id, proposals))
    }
}

/// Parse a proposal value.
///
/// Accepts three formats:
/// - Percentage format: "15%"
/// - Fixed amount once per proposal: "10.00 USD"
/// - Fixed amount per targeted unit: "5.00 USD each"
///
/// # Errors
///
/// Returns an error if the value cannot be parsed or a fixed amount is not in `currency`.
pub fn parse_value(s: &str, currency: &'static Currency) -> Result<ProposalValue, FixtureError> {
    let trimmed = s.trim();

    if let Some(percent_str) = trimmed.strip_suffix('%') {
        return Ok(ProposalValue::Percentage {
            value: parse_percentage(percent_str)?,
        });
    }

    let (price, applies_to_each_item) = match trimmed.strip_suffix("each") {
        Some(price) => (price.trim_end(), true),
        None => (trimmed, false),
    };

    let (amount, amount_currency) = parse_price(price)?;

    if amount_currency != currency {
        return Err(FixtureError::CurrencyMismatch(
            currency.iso_alpha_code.to_string(),
            amount_currency.iso_alpha_code.to_string(),
        ));
    }

    Ok(ProposalValue::FixedAmount {
        amount,
        applies_to_each_item,
    })
}

/// Parse a percentage between 0 and 100 (e.g., "15" or "12.5").
///
/// # Errors
///
/// Returns an error if the string is not a decimal in `0..=100`.
pub fn parse_percentage(s: &str) -> Result<Decimal, FixtureError> {
    let value = s
        .trim()
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))?;

    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(FixtureError::InvalidPercentage(s.to_string()));
    }

    Ok(value)
}
