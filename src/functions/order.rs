//! Order Exclusion Discount
//!
//! A percentage off the order subtotal that leaves out every cart line the configured
//! collections, tags and clearance setting do not allow.

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
pub struct OrderDiscountInput {
    /// Cart snapshot
    pub cart: Cart,

    /// Discount being evaluated
    pub discount: OrderDiscountNode,
}

/// Discount classes and configuration of the running discount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDiscountNode {
    /// Classes the discount may produce operations for
    #[serde(default)]
    pub discount_classes: Vec<DiscountClass>,

    /// Configuration metafield
    #[serde(default)]
    pub metafield: Option<Metafield>,
}

/// Discount class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountClass {
    /// Order subtotal discounts
    Order,

    /// Product line discounts
    Product,

    /// Shipping discounts
    Shipping,

    /// Any class this crate does not know about
    #[serde(other)]
    Other,
}

/// Configuration stored on the discount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDiscountConfig {
    /// Percentage off the subtotal
    #[serde(default)]
    pub percentage: Option<Decimal>,

    /// Percentage as stored by the admin settings block
    #[serde(default)]
    pub order_percentage: Option<Decimal>,

    /// Collection ids whose products qualify
    #[serde(default)]
    pub collection_ids: Vec<String>,

    /// Product tags that disqualify a product
    #[serde(default)]
    pub product_tags: Vec<String>,

    /// Leave clearance variants out of the subtotal
    #[serde(default)]
    pub exclude_clearance: bool,
}

/// Function output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDiscountResult {
    /// Operations for the platform to apply
    pub operations: Vec<Operation>,
}

/// A discount operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Add order discount candidates
    OrderDiscountsAdd(OrderDiscountsAdd),
}

/// Order discount candidates and how to pick between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDiscountsAdd {
    /// Candidate discounts
    pub candidates: Vec<OrderDiscountCandidate>,

    /// Selection strategy
    pub selection_strategy: OrderDiscountSelectionStrategy,
}

/// A candidate order discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDiscountCandidate {
    /// What the discount applies to
    pub targets: Vec<OrderDiscountTarget>,

    /// Discount value
    pub value: DiscountValue,

    /// Optional buyer-facing message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Order discount target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderDiscountTarget {
    /// The order subtotal, minus excluded lines
    OrderSubtotal(OrderSubtotalTarget),
}

/// Order subtotal target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubtotalTarget {
    /// Lines that do not count towards the discounted subtotal
    pub excluded_cart_line_ids: Vec<String>,
}

/// How the platform picks between order discount candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDiscountSelectionStrategy {
    /// First candidate
    First,

    /// Candidate with the biggest saving
    Maximum,
}

impl OrderDiscountConfig {
    /// Configured percentage, preferring `percentage` over `orderPercentage` when both are set.
    pub fn configured_percentage(&self) -> Option<Decimal> {
        self.percentage.or(self.order_percentage)
    }
}

impl OrderDiscountResult {
    /// Percentage of the first candidate, if any.
    pub fn percentage(&self) -> Option<Decimal> {
        self.operations
            .iter()
            .flat_map(|Operation::OrderDiscountsAdd(add)| add.candidates.iter())
            .map(|candidate| candidate.value.percentage.value)
            .next()
    }

    /// Excluded line ids of every subtotal target, in output order.
    pub fn excluded_cart_line_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.operations
            .iter()
            .flat_map(|Operation::OrderDiscountsAdd(add)| add.candidates.iter())
            .flat_map(|candidate| candidate.targets.iter())
            .flat_map(|OrderDiscountTarget::OrderSubtotal(target)| {
                target.excluded_cart_line_ids.iter().map(String::as_str)
            })
    }
}

/// Build the order exclusion discount for a cart.
///
/// # Errors
///
/// Returns a `FunctionError` if the configuration metafield cannot be parsed or its percentage is
/// out of range.
pub fn run(input: &OrderDiscountInput) -> Result<OrderDiscountResult, FunctionError> {
    if input.cart.lines.is_empty() || !input.discount.discount_classes.contains(&DiscountClass::Order)
    {
        debug!("empty cart or no order discount class; skipping order discount");
        return Ok(OrderDiscountResult::default());
    }

    let config: OrderDiscountConfig = parse_configuration(input.discount.metafield.as_ref())?;

    let Some(percentage) = active_percentage(config.configured_percentage())? else {
        debug!("no percentage configured; skipping order discount");
        return Ok(OrderDiscountResult::default());
    };

    let (_, excluded) = Eligibility::new(config.exclude_clearance).partition(&input.cart.lines);

    debug!(
        excluded = excluded.len(),
        lines = input.cart.lines.len(),
        "order discount built"
    );

    Ok(OrderDiscountResult {
        operations: vec![Operation::OrderDiscountsAdd(OrderDiscountsAdd {
            candidates: vec![OrderDiscountCandidate {
                targets: vec![OrderDiscountTarget::OrderSubtotal(OrderSubtotalTarget {
                    excluded_cart_line_ids: excluded.iter().map(|line| line.id.clone()).collect(),
                })],
                value: DiscountValue::percentage(percentage),
                message: None,
            }],
            selection_strategy: OrderDiscountSelectionStrategy::Maximum,
        })],
    })
}
