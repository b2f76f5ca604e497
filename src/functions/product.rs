//! Product Exclusion Discount
//!
//! A percentage off every cart line whose product is in one of the configured collections and
//! carries none of the configured tags. Clearance variants are always left out.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cart::{Cart, Metafield},
    exclusion::Eligibility,
    functions::{DiscountValue, FunctionError, active_percentage, parse_configuration},
};

/// Function input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDiscountInput {
    /// Cart snapshot
    pub cart: Cart,

    /// Discount owning the configuration metafield
    #[serde(default)]
    pub discount_node: DiscountNode,
}

/// The discount node carrying the function configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountNode {
    /// Configuration metafield
    #[serde(default)]
    pub metafield: Option<Metafield>,
}

/// Configuration stored on the discount.
///
/// `collections` and `productTags` are consumed by the input query; they arrive here already
/// resolved into each product's membership flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDiscountConfig {
    /// Percentage off; zero, `null` or missing disables the discount
    #[serde(default)]
    pub percentage: Option<Decimal>,

    /// Collection ids whose products qualify
    #[serde(default)]
    pub collections: Vec<String>,

    /// Product tags that disqualify a product
    #[serde(default)]
    pub product_tags: Vec<String>,
}

/// How the platform chooses between multiple discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountApplicationStrategy {
    /// Apply the first discount
    First,

    /// Apply the discount with the biggest saving
    Maximum,

    /// Apply every discount
    All,
}

/// Function output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDiscountResult {
    /// Discounts to apply
    pub discounts: Vec<ProductDiscount>,

    /// Selection strategy
    pub discount_application_strategy: DiscountApplicationStrategy,
}

/// A discount over a set of cart lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDiscount {
    /// Lines the discount applies to
    pub targets: Vec<ProductDiscountTarget>,

    /// Discount value
    pub value: DiscountValue,

    /// Optional buyer-facing message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Target referring to a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDiscountTarget {
    /// Cart line reference
    pub cart_line: CartLineRef,
}

/// Reference to a cart line by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineRef {
    /// Cart line id
    pub id: String,
}

impl ProductDiscountResult {
    /// Result that applies no discount.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            discounts: Vec::new(),
            discount_application_strategy: DiscountApplicationStrategy::First,
        }
    }
}

/// Build the product exclusion discount for a cart.
///
/// # Errors
///
/// Returns a `FunctionError` if the configuration metafield cannot be parsed or its percentage is
/// out of range.
pub fn run(input: &ProductDiscountInput) -> Result<ProductDiscountResult, FunctionError> {
    let config: ProductDiscountConfig =
        parse_configuration(input.discount_node.metafield.as_ref())?;

    let Some(percentage) = active_percentage(config.percentage)? else {
        debug!("no percentage configured; skipping product discount");
        return Ok(ProductDiscountResult::empty());
    };

    let (eligible, _) = Eligibility::new(true).partition(&input.cart.lines);

    if eligible.is_empty() {
        debug!("no eligible cart lines; skipping product discount");
        return Ok(ProductDiscountResult::empty());
    }

    let targets = eligible
        .iter()
        .map(|line| ProductDiscountTarget {
            cart_line: CartLineRef {
                id: line.id.clone(),
            },
        })
        .collect();

    Ok(ProductDiscountResult {
        discounts: vec![ProductDiscount {
            targets,
            value: DiscountValue::percentage(percentage),
            message: None,
        }],
        discount_application_strategy: DiscountApplicationStrategy::First,
    })
}
