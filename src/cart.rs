//! Cart

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::{self, Currency};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

new_key_type! {
    /// Cart Line Key
    pub struct CartLineKey;
}

/// Metafield value marking a variant as clearance stock.
pub const CLEARANCE_VALUE: &str = "true";

/// Errors related to cart validation and line lookups.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// The cart has no lines.
    #[error("cart has no lines")]
    Empty,

    /// Two lines share the same id.
    #[error("cart line {0} appears more than once")]
    DuplicateLine(String),

    /// A line quantity is zero or negative.
    #[error("cart line {id} has invalid quantity {quantity}")]
    InvalidQuantity {
        /// Cart line id
        id: String,
        /// Offending quantity
        quantity: i64,
    },

    /// A line has a negative unit amount.
    #[error("cart line {0} has a negative unit amount")]
    NegativeAmount(String),

    /// A line's currency differs from the first priced line (line id, line currency, cart currency).
    #[error("cart line {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(String, String, String),

    /// A currency code is not an ISO 4217 currency.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Cart snapshot supplied by the checkout runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in checkout order
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Opaque line id
    pub id: String,

    /// Number of units on the line
    pub quantity: i64,

    /// Line cost
    pub cost: CartLineCost,

    /// What is being bought
    pub merchandise: Merchandise,
}

/// Cost information for a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineCost {
    /// Price of a single unit
    pub amount_per_quantity: MoneyAmount,
}

/// A decimal amount with an optional ISO currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyAmount {
    /// Decimal amount in major units
    pub amount: Decimal,

    /// ISO 4217 code, when the input query asked for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

/// Merchandise on a cart line, tagged by the platform's `__typename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum Merchandise {
    /// A product variant.
    ProductVariant(ProductVariant),

    /// A custom (non-catalog) product.
    CustomProduct,

    /// Any merchandise type this crate does not know about.
    #[serde(other)]
    Other,
}

/// Product variant merchandise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    /// Variant id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Clearance metafield
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metafield: Option<Metafield>,

    /// Collection and tag membership, evaluated by the input query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductMembership>,
}

/// A metafield value as a raw string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafield {
    /// Raw metafield value
    pub value: String,
}

/// Product membership flags resolved by the checkout runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMembership {
    /// Product belongs to at least one configured collection
    #[serde(default)]
    pub in_any_collection: bool,

    /// Product carries at least one configured tag
    #[serde(default)]
    pub has_any_tag: bool,
}

impl CartLine {
    /// Price of a single unit.
    pub fn unit_amount(&self) -> Decimal {
        self.cost.amount_per_quantity.amount
    }

    /// Currency code of the unit price, if known.
    pub fn currency_code(&self) -> Option<&str> {
        self.cost.amount_per_quantity.currency_code.as_deref()
    }

    /// Returns the variant when the merchandise is a product variant.
    pub fn variant(&self) -> Option<&ProductVariant> {
        match &self.merchandise {
            Merchandise::ProductVariant(variant) => Some(variant),
            Merchandise::CustomProduct | Merchandise::Other => None,
        }
    }

    /// Whether the line is a product variant flagged as clearance.
    pub fn is_clearance(&self) -> bool {
        self.variant().is_some_and(ProductVariant::is_clearance)
    }
}

impl ProductVariant {
    /// Whether the clearance metafield is set to exactly `"true"`.
    pub fn is_clearance(&self) -> bool {
        self.metafield
            .as_ref()
            .is_some_and(|metafield| metafield.value == CLEARANCE_VALUE)
    }
}

/// Id-keyed view over a validated cart.
///
/// Lines live in a `SlotMap` arena; ids are resolved through a hash map built once per call.
#[derive(Debug)]
pub struct CartIndex<'c> {
    lines: SlotMap<CartLineKey, &'c CartLine>,
    keys: FxHashMap<&'c str, CartLineKey>,
    order: Vec<CartLineKey>,
    currency: Option<&'static Currency>,
}

impl<'c> CartIndex<'c> {
    /// Validate the cart and build the line lookup.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if the cart is empty, a line id repeats, a quantity is not positive,
    /// a unit amount is negative, or line currencies are unknown or disagree.
    pub fn build(cart: &'c Cart) -> Result<Self, CartError> {
        if cart.lines.is_empty() {
            return Err(CartError::Empty);
        }

        let mut lines = SlotMap::with_capacity_and_key(cart.lines.len());
        let mut keys = FxHashMap::default();
        let mut order = Vec::with_capacity(cart.lines.len());
        let mut currency: Option<&'static Currency> = None;

        for line in &cart.lines {
            if line.quantity <= 0 {
                return Err(CartError::InvalidQuantity {
                    id: line.id.clone(),
                    quantity: line.quantity,
                });
            }

            if line.unit_amount() < Decimal::ZERO {
                return Err(CartError::NegativeAmount(line.id.clone()));
            }

            if let Some(code) = line.currency_code() {
                let line_currency = find_currency(code)?;

                match currency {
                    Some(existing) if existing != line_currency => {
                        return Err(CartError::CurrencyMismatch(
                            line.id.clone(),
                            line_currency.iso_alpha_code.to_string(),
                            existing.iso_alpha_code.to_string(),
                        ));
                    }
                    Some(_) => {}
                    None => currency = Some(line_currency),
                }
            }

            let key = lines.insert(line);

            if keys.insert(line.id.as_str(), key).is_some() {
                return Err(CartError::DuplicateLine(line.id.clone()));
            }

            order.push(key);
        }

        Ok(Self {
            lines,
            keys,
            order,
            currency,
        })
    }

    /// Look up the arena key for a line id.
    pub fn key(&self, id: &str) -> Option<CartLineKey> {
        self.keys.get(id).copied()
    }

    /// Resolve a line id to its line.
    pub fn line(&self, id: &str) -> Option<&'c CartLine> {
        self.key(id).and_then(|key| self.get(key))
    }

    /// Fetch a line by arena key.
    pub fn get(&self, key: CartLineKey) -> Option<&'c CartLine> {
        self.lines.get(key).copied()
    }

    /// Iterate lines in their original cart order.
    pub fn iter(&self) -> impl Iterator<Item = (CartLineKey, &'c CartLine)> + '_ {
        self.order
            .iter()
            .filter_map(|&key| self.get(key).map(|line| (key, line)))
    }

    /// Currency shared by every priced line, if any line declared one.
    pub fn currency(&self) -> Option<&'static Currency> {
        self.currency
    }

    /// Number of lines in the cart.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Find an ISO 4217 currency by its alphabetic code.
///
/// # Errors
///
/// Returns `CartError::UnknownCurrency` when the code is not recognised.
pub fn find_currency(code: &str) -> Result<&'static Currency, CartError> {
    iso::find(code).ok_or_else(|| CartError::UnknownCurrency(code.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    pub(crate) fn line(id: &str, amount: i64, quantity: i64) -> CartLine {
        CartLine {
            id: id.to_string(),
            quantity,
            cost: CartLineCost {
                amount_per_quantity: MoneyAmount {
                    amount: Decimal::from(amount),
                    currency_code: None,
                },
            },
            merchandise: Merchandise::ProductVariant(ProductVariant::default()),
        }
    }

    pub(crate) fn clearance_line(id: &str, amount: i64, quantity: i64) -> CartLine {
        let mut line = line(id, amount, quantity);

        line.merchandise = Merchandise::ProductVariant(ProductVariant {
            metafield: Some(Metafield {
                value: CLEARANCE_VALUE.to_string(),
            }),
            ..ProductVariant::default()
        });

        line
    }

    fn priced(mut line: CartLine, code: &str) -> CartLine {
        line.cost.amount_per_quantity.currency_code = Some(code.to_string());
        line
    }

    #[test]
    fn build_resolves_lines_by_id() -> TestResult {
        let cart = Cart {
            lines: vec![line("gid://shopify/CartLine/10", 5, 1), line("a", 3, 2)],
        };

        let index = CartIndex::build(&cart)?;

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.line("gid://shopify/CartLine/10").map(|l| l.quantity),
            Some(1)
        );
        assert_eq!(index.line("a").map(CartLine::unit_amount), Some(Decimal::from(3)));
        assert!(index.line("missing").is_none());

        Ok(())
    }

    #[test]
    fn iter_keeps_cart_order() -> TestResult {
        let cart = Cart {
            lines: vec![line("c", 1, 1), line("a", 1, 1), line("b", 1, 1)],
        };

        let index = CartIndex::build(&cart)?;
        let ids: Vec<&str> = index.iter().map(|(_, line)| line.id.as_str()).collect();

        assert_eq!(ids, ["c", "a", "b"]);

        Ok(())
    }

    #[test]
    fn build_rejects_empty_cart() {
        let cart = Cart { lines: Vec::new() };

        assert!(matches!(CartIndex::build(&cart), Err(CartError::Empty)));
    }

    #[test]
    fn build_rejects_duplicate_ids() {
        let cart = Cart {
            lines: vec![line("a", 1, 1), line("a", 2, 1)],
        };

        assert_eq!(
            CartIndex::build(&cart).err(),
            Some(CartError::DuplicateLine("a".to_string()))
        );
    }

    #[test]
    fn build_rejects_non_positive_quantity() {
        let cart = Cart {
            lines: vec![line("a", 1, 0)],
        };

        assert_eq!(
            CartIndex::build(&cart).err(),
            Some(CartError::InvalidQuantity {
                id: "a".to_string(),
                quantity: 0
            })
        );
    }

    #[test]
    fn build_rejects_negative_amount() {
        let cart = Cart {
            lines: vec![line("a", -1, 1)],
        };

        assert_eq!(
            CartIndex::build(&cart).err(),
            Some(CartError::NegativeAmount("a".to_string()))
        );
    }

    #[test]
    fn build_records_shared_currency() -> TestResult {
        let cart = Cart {
            lines: vec![priced(line("a", 1, 1), "USD"), line("b", 1, 1)],
        };

        let index = CartIndex::build(&cart)?;

        assert_eq!(index.currency(), Some(iso::USD));

        Ok(())
    }

    #[test]
    fn build_rejects_currency_mismatch() {
        let cart = Cart {
            lines: vec![priced(line("a", 1, 1), "USD"), priced(line("b", 1, 1), "GBP")],
        };

        match CartIndex::build(&cart) {
            Err(CartError::CurrencyMismatch(id, found, expected)) => {
                assert_eq!(id, "b");
                assert_eq!(found, iso::GBP.iso_alpha_code);
                assert_eq!(expected, iso::USD.iso_alpha_code);
            }
            other => panic!("expected CurrencyMismatch error, got {other:?}"),
        }
    }

    #[test]
    fn build_rejects_unknown_currency() {
        let cart = Cart {
            lines: vec![priced(line("a", 1, 1), "XYZ")],
        };

        assert_eq!(
            CartIndex::build(&cart).err(),
            Some(CartError::UnknownCurrency("XYZ".to_string()))
        );
    }

    #[test]
    fn clearance_requires_exact_true() {
        let mut variant = ProductVariant {
            metafield: Some(Metafield {
                value: "TRUE".to_string(),
            }),
            ..ProductVariant::default()
        };

        assert!(!variant.is_clearance());

        variant.metafield = Some(Metafield {
            value: "true".to_string(),
        });

        assert!(variant.is_clearance());
        assert!(clearance_line("a", 1, 1).is_clearance());
        assert!(!line("b", 1, 1).is_clearance());
    }

    #[test]
    fn merchandise_deserializes_by_typename() -> TestResult {
        let variant: Merchandise = serde_json::from_str(
            r#"{"__typename":"ProductVariant","id":"gid://shopify/ProductVariant/1","metafield":{"value":"true"}}"#,
        )?;
        let custom: Merchandise = serde_json::from_str(r#"{"__typename":"CustomProduct"}"#)?;
        let other: Merchandise =
            serde_json::from_str(r#"{"__typename":"GiftCard","id":"gid://shopify/GiftCard/1"}"#)?;

        assert!(matches!(variant, Merchandise::ProductVariant(v) if v.is_clearance()));
        assert_eq!(custom, Merchandise::CustomProduct);
        assert_eq!(other, Merchandise::Other);

        Ok(())
    }
}
