//! Exclusion Rules
//!
//! Decides which cart lines a collection/tag discount may touch. A line qualifies when it is a
//! product variant whose product sits in one of the configured collections, carries none of the
//! configured tags and, when clearance is excluded, is not flagged as clearance.

use std::fmt;

use smallvec::SmallVec;

use crate::cart::CartLine;

/// Why a line was kept out of a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The merchandise is not a product variant.
    NotProductVariant,

    /// The product is not in any configured collection.
    OutsideCollections,

    /// The product carries an excluded tag.
    Tagged,

    /// The variant is flagged as clearance.
    Clearance,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotProductVariant => "not a product variant",
            Self::OutsideCollections => "outside configured collections",
            Self::Tagged => "has an excluded tag",
            Self::Clearance => "clearance variant",
        };

        f.write_str(reason)
    }
}

/// Eligibility rule for collection/tag discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    /// Keep clearance variants out of the discount
    pub exclude_clearance: bool,
}

impl Default for Eligibility {
    fn default() -> Self {
        Self {
            exclude_clearance: true,
        }
    }
}

impl Eligibility {
    /// Create a rule, optionally letting clearance variants through.
    #[must_use]
    pub const fn new(exclude_clearance: bool) -> Self {
        Self { exclude_clearance }
    }

    /// The first reason the line is excluded, or `None` when it qualifies.
    pub fn exclusion_reason(&self, line: &CartLine) -> Option<ExclusionReason> {
        let Some(variant) = line.variant() else {
            return Some(ExclusionReason::NotProductVariant);
        };

        let membership = variant.product.unwrap_or_default();

        if !membership.in_any_collection {
            return Some(ExclusionReason::OutsideCollections);
        }

        if membership.has_any_tag {
            return Some(ExclusionReason::Tagged);
        }

        if self.exclude_clearance && variant.is_clearance() {
            return Some(ExclusionReason::Clearance);
        }

        None
    }

    /// Whether the line may receive the discount.
    pub fn is_eligible(&self, line: &CartLine) -> bool {
        self.exclusion_reason(line).is_none()
    }

    /// Split lines into `(eligible, excluded)`, keeping cart order within each side.
    pub fn partition<'c>(
        &self,
        lines: &'c [CartLine],
    ) -> (SmallVec<[&'c CartLine; 8]>, SmallVec<[&'c CartLine; 8]>) {
        lines.iter().partition(|line| self.is_eligible(line))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::cart::{
        CartLineCost, Merchandise, Metafield, MoneyAmount, ProductMembership, ProductVariant,
    };

    use super::*;

    fn line(id: &str, in_any_collection: bool, has_any_tag: bool, clearance: bool) -> CartLine {
        CartLine {
            id: id.to_string(),
            quantity: 1,
            cost: CartLineCost {
                amount_per_quantity: MoneyAmount {
                    amount: Decimal::from(10),
                    currency_code: None,
                },
            },
            merchandise: Merchandise::ProductVariant(ProductVariant {
                id: None,
                metafield: clearance.then(|| Metafield {
                    value: "true".to_string(),
                }),
                product: Some(ProductMembership {
                    in_any_collection,
                    has_any_tag,
                }),
            }),
        }
    }

    #[test]
    fn collection_member_without_tags_is_eligible() {
        let rule = Eligibility::default();

        assert!(rule.is_eligible(&line("a", true, false, false)));
    }

    #[test]
    fn reasons_are_reported_in_order() {
        let rule = Eligibility::default();

        assert_eq!(
            rule.exclusion_reason(&line("a", false, true, true)),
            Some(ExclusionReason::OutsideCollections)
        );
        assert_eq!(
            rule.exclusion_reason(&line("b", true, true, true)),
            Some(ExclusionReason::Tagged)
        );
        assert_eq!(
            rule.exclusion_reason(&line("c", true, false, true)),
            Some(ExclusionReason::Clearance)
        );
    }

    #[test]
    fn clearance_allowed_when_not_excluded() {
        let rule = Eligibility::new(false);

        assert!(rule.is_eligible(&line("a", true, false, true)));
    }

    #[test]
    fn non_variant_merchandise_is_excluded() {
        let mut custom = line("a", true, false, false);
        custom.merchandise = Merchandise::CustomProduct;

        assert_eq!(
            Eligibility::default().exclusion_reason(&custom),
            Some(ExclusionReason::NotProductVariant)
        );
    }

    #[test]
    fn missing_membership_counts_as_outside_collections() {
        let mut bare = line("a", true, false, false);
        bare.merchandise = Merchandise::ProductVariant(ProductVariant::default());

        assert_eq!(
            Eligibility::default().exclusion_reason(&bare),
            Some(ExclusionReason::OutsideCollections)
        );
    }

    #[test]
    fn partition_keeps_cart_order() {
        let lines = [
            line("a", true, false, false),
            line("b", false, false, false),
            line("c", true, false, false),
            line("d", true, false, true),
        ];

        let (eligible, excluded) = Eligibility::default().partition(&lines);

        let eligible: Vec<&str> = eligible.iter().map(|l| l.id.as_str()).collect();
        let excluded: Vec<&str> = excluded.iter().map(|l| l.id.as_str()).collect();

        assert_eq!(eligible, ["a", "c"]);
        assert_eq!(excluded, ["b", "d"]);
    }
}
