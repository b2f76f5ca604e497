//! Cart Fixtures

use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::Deserialize;

use crate::{
    cart::{
        CLEARANCE_VALUE, CartLine, CartLineCost, Merchandise, Metafield, MoneyAmount,
        ProductMembership, ProductVariant, find_currency,
    },
    fixtures::FixtureError,
};

/// Wrapper for cart lines in YAML
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Lines in cart order
    #[serde(default)]
    pub lines: Vec<LineFixture>,
}

/// Cart Line Fixture
#[derive(Debug, Deserialize)]
pub struct LineFixture {
    /// Line id
    pub id: String,

    /// Unit price (e.g., "189.00 USD")
    pub price: String,

    /// Units on the line
    #[serde(default = "one")]
    pub quantity: i64,

    /// Variant is on clearance
    #[serde(default)]
    pub clearance: bool,

    /// Product is in a configured collection
    #[serde(default = "yes")]
    pub in_collection: bool,

    /// Product carries an excluded tag
    #[serde(default)]
    pub tagged: bool,

    /// Line is a custom product rather than a catalog variant
    #[serde(default)]
    pub custom: bool,
}

const fn one() -> i64 {
    1
}

const fn yes() -> bool {
    true
}

impl LineFixture {
    /// Convert to a `CartLine`, returning the currency of its price.
    ///
    /// # Errors
    ///
    /// Returns an error if the price cannot be parsed.
    pub fn into_line(self) -> Result<(CartLine, &'static Currency), FixtureError> {
        let (amount, currency) = parse_price(&self.price)?;

        let merchandise = if self.custom {
            Merchandise::CustomProduct
        } else {
            Merchandise::ProductVariant(ProductVariant {
                id: Some(format!("{}-variant", self.id)),
                metafield: self.clearance.then(|| Metafield {
                    value: CLEARANCE_VALUE.to_string(),
                }),
                product: Some(ProductMembership {
                    in_any_collection: self.in_collection,
                    has_any_tag: self.tagged,
                }),
            })
        };

        let line = CartLine {
            id: self.id,
            quantity: self.quantity,
            cost: CartLineCost {
                amount_per_quantity: MoneyAmount {
                    amount,
                    currency_code: Some(currency.iso_alpha_code.to_string()),
                },
            },
            merchandise,
        };

        Ok((line, currency))
    }
}

/// Parse price string (e.g., "2.99 USD") into a decimal amount and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if the amount cannot be
/// parsed as a decimal, or if the currency code is not recognized.
pub fn parse_price(s: &str) -> Result<(Decimal, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    let [amount, currency_code] = parts.as_slice() else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    if amount < Decimal::ZERO {
        return Err(FixtureError::InvalidPrice(s.to_string()));
    }

    Ok((amount, find_currency(currency_code)?))
}
