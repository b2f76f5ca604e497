//! Fixtures
//!
//! YAML scenario sets describing a cart and the discounts competing for it. A set named `name`
//! lives in `carts/{name}.yml` and `discounts/{name}.yml` under the fixture base path.

use std::{fs, path::PathBuf};

use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    allocator::AllocatorInput,
    cart::{Cart, CartError, CartLine},
    discounts::Discount,
    fixtures::{cart::CartFixture, discounts::DiscountsFixture},
};

pub mod cart;
pub mod discounts;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between lines or discount amounts
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Cart line not found
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Discounts were loaded before the cart they target
    #[error("No cart loaded; load a cart before its discounts")]
    NoCart,
}

impl From<CartError> for FixtureError {
    fn from(error: CartError) -> Self {
        match error {
            CartError::UnknownCurrency(code) => Self::UnknownCurrency(code),
            other => Self::InvalidPrice(other.to_string()),
        }
    }
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Cart lines in file order
    lines: Vec<CartLine>,

    /// Line id -> position in `lines`
    line_keys: FxHashMap<String, usize>,

    /// Discounts in file order
    discounts: Vec<Discount>,

    /// Currency for the fixture set
    currency: Option<&'static Currency>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            lines: Vec::new(),
            line_keys: FxHashMap::default(),
            discounts: Vec::new(),
            currency: None,
        }
    }

    /// Load cart lines from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if line prices disagree on
    /// currency.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("carts").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CartFixture = serde_norway::from_str(&contents)?;

        for line_fixture in fixture.lines {
            let (line, currency) = line_fixture.into_line()?;

            self.ensure_currency(currency)?;

            self.line_keys.insert(line.id.clone(), self.lines.len());
            self.lines.push(line);
        }

        Ok(self)
    }

    /// Load discounts from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if a target names a line that was
    /// not loaded, or if a discount value cannot be parsed.
    pub fn load_discounts(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let currency = self.currency.ok_or(FixtureError::NoCart)?;

        let file_path = self.base_path.join("discounts").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: DiscountsFixture = serde_norway::from_str(&contents)?;

        for discount_fixture in fixture.discounts {
            let discount = discount_fixture.try_into_discount(currency, |id| {
                self.line(id).map(|line| line.quantity)
            })?;

            self.discounts.push(discount);
        }

        Ok(self)
    }

    /// Load a complete fixture set (cart and discounts with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        Self::set_from(Self::new(), name)
    }

    /// Load a complete fixture set from a custom base path
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set_in(base_path: impl Into<PathBuf>, name: &str) -> Result<Self, FixtureError> {
        Self::set_from(Self::with_base_path(base_path), name)
    }

    fn set_from(mut fixture: Self, name: &str) -> Result<Self, FixtureError> {
        fixture.load_cart(name)?.load_discounts(name)?;

        Ok(fixture)
    }

    /// Get a cart line by its id
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not found.
    pub fn line(&self, id: &str) -> Result<&CartLine, FixtureError> {
        self.line_keys
            .get(id)
            .and_then(|&position| self.lines.get(position))
            .ok_or_else(|| FixtureError::LineNotFound(id.to_string()))
    }

    /// Get all cart lines
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Get all discounts
    pub fn discounts(&self) -> &[Discount] {
        &self.discounts
    }

    /// Currency of the fixture set, once a cart is loaded
    pub fn currency(&self) -> Option<&'static Currency> {
        self.currency
    }

    /// Build allocator input from the loaded cart and discounts
    pub fn input(&self) -> AllocatorInput {
        AllocatorInput {
            cart: Cart {
                lines: self.lines.clone(),
            },
            discounts: self.discounts.clone(),
        }
    }

    fn ensure_currency(&mut self, currency: &'static Currency) -> Result<(), FixtureError> {
        match self.currency {
            Some(existing) if existing != currency => Err(FixtureError::CurrencyMismatch(
                existing.iso_alpha_code.to_string(),
                currency.iso_alpha_code.to_string(),
            )),
            Some(_) => Ok(()),
            None => {
                self.currency = Some(currency);
                Ok(())
            }
        }
    }
}
