//! Discounts
//!
//! Discount proposals competing for cart lines, as handed to the allocator by the checkout
//! runtime.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A discount and the proposals it puts forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    /// Discount id, used to attribute displayable errors
    pub id: String,

    /// Candidate computations for this discount
    #[serde(default)]
    pub discount_proposals: Vec<DiscountProposal>,
}

/// One candidate discount computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountProposal {
    /// Handle tagging every allocation this proposal produces
    pub handle: String,

    /// Cart lines and quantities the proposal applies to
    pub targets: Vec<CartLineTarget>,

    /// Fixed amount or percentage
    pub value: ProposalValue,
}

/// A `(cart line, quantity)` pair targeted by a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineTarget {
    /// Id of the targeted cart line
    pub cart_line_id: String,

    /// Number of units targeted
    pub quantity: i64,
}

/// Value of a proposal, tagged by the platform's `__typename`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum ProposalValue {
    /// A fixed monetary amount.
    #[serde(rename_all = "camelCase")]
    FixedAmount {
        /// Amount in major units
        amount: Decimal,

        /// Apply `amount` to every targeted unit rather than once per proposal
        #[serde(default)]
        applies_to_each_item: bool,
    },

    /// A percentage between 0 and 100.
    Percentage {
        /// Percentage value
        value: Decimal,
    },
}

impl DiscountProposal {
    /// Create a new proposal.
    pub fn new(
        handle: impl Into<String>,
        targets: impl Into<Vec<CartLineTarget>>,
        value: ProposalValue,
    ) -> Self {
        Self {
            handle: handle.into(),
            targets: targets.into(),
            value,
        }
    }
}

impl CartLineTarget {
    /// Target `quantity` units of the given line.
    pub fn new(cart_line_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            cart_line_id: cart_line_id.into(),
            quantity,
        }
    }
}

impl Discount {
    /// Create a discount from its proposals.
    pub fn new(id: impl Into<String>, discount_proposals: impl Into<Vec<DiscountProposal>>) -> Self {
        Self {
            id: id.into(),
            discount_proposals: discount_proposals.into(),
        }
    }
}
