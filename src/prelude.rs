//! Tress prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    allocator::{
        Allocation, AllocatorError, AllocatorInput, AllocatorOptions, AllocatorOutput,
        CLEARANCE_ITEM_IN_CART, DisplayableError, ErrorReporting, FixedAmountPolicy,
        LineAllocation, allocate,
    },
    cart::{Cart, CartError, CartIndex, CartLine, CartLineKey, Merchandise, ProductVariant},
    discounts::{CartLineTarget, Discount, DiscountProposal, ProposalValue},
    exclusion::{Eligibility, ExclusionReason},
    fixtures::{Fixture, FixtureError},
    functions::{
        DiscountValue, FunctionError,
        order::{self, OrderDiscountInput, OrderDiscountResult},
        product::{self, ProductDiscountInput, ProductDiscountResult},
    },
    pricing::PricingError,
    report::{AllocationReport, ReportError, Totals},
};
