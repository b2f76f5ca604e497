//! Discount Allocator
//!
//! Splits every discount proposal over the cart lines it targets. Fixed amounts either apply per
//! targeted unit or are prorated by each target's share of the proposal's total price;
//! percentages are always prorated. Lines holding clearance variants never receive an
//! allocation, and each discount that tried to touch one gets a displayable error instead.
//!
//! The allocator is a pass-through calculator: it does not cap allocations at the line price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    cart::{Cart, CartError, CartIndex, CartLine, CartLineKey},
    discounts::{CartLineTarget, Discount, DiscountProposal, ProposalValue},
    pricing::{
        PricingError, prorated_amount, prorated_percentage, ratio, round_to_currency,
        target_price, total_price,
    },
};

/// Reason attached to discounts that targeted a clearance line.
pub const CLEARANCE_ITEM_IN_CART: &str = "Some items in cart are not eligible for discount";

/// Errors raised for input the allocator cannot interpret.
#[derive(Debug, Error, PartialEq)]
pub enum AllocatorError {
    /// The cart failed validation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Decimal arithmetic overflowed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// A proposal targets a line that is not in the cart.
    #[error("proposal {handle} targets unknown cart line {cart_line_id}")]
    UnknownCartLine {
        /// Proposal handle
        handle: String,
        /// Unresolved cart line id
        cart_line_id: String,
    },

    /// A proposal target has a zero or negative quantity.
    #[error("proposal {handle} targets {quantity} units of cart line {cart_line_id}")]
    InvalidTargetQuantity {
        /// Proposal handle
        handle: String,
        /// Targeted cart line id
        cart_line_id: String,
        /// Offending quantity
        quantity: i64,
    },

    /// A fixed amount proposal carries a negative amount.
    #[error("proposal {0} has a negative fixed amount")]
    NegativeAmount(String),

    /// A percentage proposal is outside `0..=100`.
    #[error("proposal {handle} has percentage {value} outside 0..=100")]
    PercentageOutOfRange {
        /// Proposal handle
        handle: String,
        /// Offending percentage
        value: Decimal,
    },

    /// A once-per-proposal fixed amount was rejected by [`FixedAmountPolicy::Reject`].
    #[error("proposal {0} has a fixed amount that does not apply to each item")]
    UnsupportedFixedAmount(String),
}

/// How fixed amounts that do not apply to each item are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FixedAmountPolicy {
    /// Split the amount over the targets by their share of the total target price.
    #[default]
    Prorate,

    /// Fail with [`AllocatorError::UnsupportedFixedAmount`].
    Reject,
}

/// How clearance exclusions are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorReporting {
    /// One error for every excluded target.
    #[default]
    PerTarget,

    /// At most one error per discount.
    PerDiscount,
}

/// Allocator behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorOptions {
    /// Handling of once-per-proposal fixed amounts
    pub fixed_amount: FixedAmountPolicy,

    /// Handling of repeated clearance errors
    pub errors: ErrorReporting,
}

/// Everything the allocator reads for one checkout calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatorInput {
    /// Cart snapshot
    pub cart: Cart,

    /// Competing discounts
    #[serde(default)]
    pub discounts: Vec<Discount>,
}

/// Allocator result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatorOutput {
    /// Lines with at least one non-zero allocation, in cart order
    pub line_discounts: Vec<LineAllocation>,

    /// Errors to show the buyer
    pub displayable_errors: Vec<DisplayableError>,
}

/// Allocations for a single cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAllocation {
    /// Cart line id
    pub cart_line_id: String,

    /// Line quantity, echoed from the cart
    pub quantity: i64,

    /// One entry per proposal that discounted this line
    pub allocations: SmallVec<[Allocation; 2]>,
}

/// Amount a proposal takes off a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Handle of the proposal
    pub discount_proposal_id: String,

    /// Discount amount, never zero or negative
    pub amount: Decimal,
}

/// A buyer-facing message about a discount that could not be fully applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayableError {
    /// Discount the message is about
    pub discount_id: String,

    /// Message text
    pub reason: String,
}

impl LineAllocation {
    /// Sum of every allocation on the line.
    ///
    /// # Errors
    ///
    /// - [`PricingError::Overflow`]: the sum does not fit in a `Decimal`.
    pub fn total(&self) -> Result<Decimal, PricingError> {
        total_price(self.allocations.iter().map(|allocation| allocation.amount))
    }
}

impl AllocatorOutput {
    /// Whether nothing was allocated and nothing needs reporting.
    pub fn is_empty(&self) -> bool {
        self.line_discounts.is_empty() && self.displayable_errors.is_empty()
    }

    /// Allocations recorded for a cart line, if any.
    pub fn line(&self, cart_line_id: &str) -> Option<&LineAllocation> {
        self.line_discounts
            .iter()
            .find(|line| line.cart_line_id == cart_line_id)
    }
}

/// A proposal target resolved against the cart.
#[derive(Debug)]
struct ResolvedTarget<'c> {
    key: CartLineKey,
    line: &'c CartLine,
    target: &'c CartLineTarget,
    price: Decimal,
}

/// Allocate every discount proposal over the cart.
///
/// # Errors
///
/// Returns an `AllocatorError` if the cart fails validation, a proposal targets an unknown line
/// or a non-positive quantity, a proposal value is out of range or rejected by
/// [`AllocatorOptions::fixed_amount`], or decimal arithmetic overflows.
pub fn allocate(
    input: &AllocatorInput,
    options: AllocatorOptions,
) -> Result<AllocatorOutput, AllocatorError> {
    let index = CartIndex::build(&input.cart)?;

    let mut allocations: SecondaryMap<CartLineKey, SmallVec<[Allocation; 2]>> =
        SecondaryMap::with_capacity(index.len());
    let mut displayable_errors = Vec::new();

    for discount in &input.discounts {
        for proposal in &discount.discount_proposals {
            allocate_proposal(
                &index,
                discount,
                proposal,
                options,
                &mut allocations,
                &mut displayable_errors,
            )?;
        }
    }

    let line_discounts = index
        .iter()
        .filter_map(|(key, line)| {
            let line_allocations = allocations.remove(key)?;

            (!line_allocations.is_empty()).then(|| LineAllocation {
                cart_line_id: line.id.clone(),
                quantity: line.quantity,
                allocations: line_allocations,
            })
        })
        .collect();

    Ok(AllocatorOutput {
        line_discounts,
        displayable_errors,
    })
}

fn allocate_proposal<'c>(
    index: &CartIndex<'c>,
    discount: &Discount,
    proposal: &'c DiscountProposal,
    options: AllocatorOptions,
    allocations: &mut SecondaryMap<CartLineKey, SmallVec<[Allocation; 2]>>,
    displayable_errors: &mut Vec<DisplayableError>,
) -> Result<(), AllocatorError> {
    validate_value(proposal, options.fixed_amount)?;

    let targets = resolve_targets(index, proposal)?;
    let total = total_price(targets.iter().map(|target| target.price))?;

    if total.is_zero() {
        debug!(
            discount = %discount.id,
            proposal = %proposal.handle,
            "targets have no price; nothing to allocate"
        );
    }

    for target in &targets {
        let amount = match ratio(target.price, total) {
            Some(share) => line_discount_amount(&proposal.value, target.target, total, share)?,
            None => Decimal::ZERO,
        };

        if target.line.is_clearance() {
            debug!(
                discount = %discount.id,
                proposal = %proposal.handle,
                cart_line = %target.line.id,
                "clearance line excluded from discount"
            );

            record_exclusion(discount, options.errors, displayable_errors);

            continue;
        }

        let amount = round_to_currency(amount, index.currency());

        if amount <= Decimal::ZERO {
            continue;
        }

        trace!(
            proposal = %proposal.handle,
            cart_line = %target.line.id,
            %amount,
            "allocated"
        );

        if let Some(entry) = allocations.entry(target.key) {
            entry.or_default().push(Allocation {
                discount_proposal_id: proposal.handle.clone(),
                amount,
            });
        }
    }

    Ok(())
}

fn validate_value(
    proposal: &DiscountProposal,
    fixed_amount: FixedAmountPolicy,
) -> Result<(), AllocatorError> {
    match proposal.value {
        ProposalValue::FixedAmount { amount, .. } if amount < Decimal::ZERO => {
            Err(AllocatorError::NegativeAmount(proposal.handle.clone()))
        }
        ProposalValue::FixedAmount {
            applies_to_each_item: false,
            ..
        } if fixed_amount == FixedAmountPolicy::Reject => Err(
            AllocatorError::UnsupportedFixedAmount(proposal.handle.clone()),
        ),
        ProposalValue::Percentage { value }
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED =>
        {
            Err(AllocatorError::PercentageOutOfRange {
                handle: proposal.handle.clone(),
                value,
            })
        }
        ProposalValue::FixedAmount { .. } | ProposalValue::Percentage { .. } => Ok(()),
    }
}

fn resolve_targets<'c>(
    index: &CartIndex<'c>,
    proposal: &'c DiscountProposal,
) -> Result<SmallVec<[ResolvedTarget<'c>; 4]>, AllocatorError> {
    proposal
        .targets
        .iter()
        .map(|target| {
            if target.quantity <= 0 {
                return Err(AllocatorError::InvalidTargetQuantity {
                    handle: proposal.handle.clone(),
                    cart_line_id: target.cart_line_id.clone(),
                    quantity: target.quantity,
                });
            }

            let key = index.key(&target.cart_line_id).ok_or_else(|| {
                AllocatorError::UnknownCartLine {
                    handle: proposal.handle.clone(),
                    cart_line_id: target.cart_line_id.clone(),
                }
            })?;

            let line = index
                .get(key)
                .ok_or_else(|| AllocatorError::UnknownCartLine {
                    handle: proposal.handle.clone(),
                    cart_line_id: target.cart_line_id.clone(),
                })?;

            let price = target_price(line.unit_amount(), target.quantity)?;

            Ok(ResolvedTarget {
                key,
                line,
                target,
                price,
            })
        })
        .collect()
}

/// Amount a proposal value takes off one target, before clearance and rounding.
fn line_discount_amount(
    value: &ProposalValue,
    target: &CartLineTarget,
    total: Decimal,
    share: Decimal,
) -> Result<Decimal, PricingError> {
    match *value {
        ProposalValue::FixedAmount {
            amount,
            applies_to_each_item: true,
        } => target_price(amount, target.quantity),
        ProposalValue::FixedAmount {
            amount,
            applies_to_each_item: false,
        } => prorated_amount(amount, share),
        ProposalValue::Percentage { value } => prorated_percentage(value, total, share),
    }
}

fn record_exclusion(
    discount: &Discount,
    reporting: ErrorReporting,
    displayable_errors: &mut Vec<DisplayableError>,
) {
    if reporting == ErrorReporting::PerDiscount
        && displayable_errors
            .iter()
            .any(|error| error.discount_id == discount.id)
    {
        return;
    }

    displayable_errors.push(DisplayableError {
        discount_id: discount.id.clone(),
        reason: CLEARANCE_ITEM_IN_CART.to_string(),
    });
}
