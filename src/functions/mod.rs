//! Discount Functions
//!
//! Checkout entry points that turn a JSON configuration metafield and a cart into discount
//! operations for the platform to apply.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::cart::Metafield;

pub mod order;
pub mod product;

/// Errors raised while running a discount function.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// The configuration metafield is not valid JSON for this function.
    #[error("invalid function configuration: {0}")]
    Configuration(#[from] serde_json::Error),

    /// The configured percentage is outside `0..=100`.
    #[error("configured percentage {0} is outside 0..=100")]
    PercentageOutOfRange(Decimal),
}

/// Percentage discount value as written to function output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountValue {
    /// Percentage off
    pub percentage: PercentageValue,
}

/// A percentage between 0 and 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentageValue {
    /// Percentage value
    pub value: Decimal,
}

impl DiscountValue {
    /// Percentage discount value.
    #[must_use]
    pub const fn percentage(value: Decimal) -> Self {
        Self {
            percentage: PercentageValue { value },
        }
    }
}

/// Parse a configuration metafield, treating a missing metafield as `{}`.
///
/// # Errors
///
/// Returns `FunctionError::Configuration` if the metafield value is not valid JSON for `T`.
pub fn parse_configuration<T: DeserializeOwned>(
    metafield: Option<&Metafield>,
) -> Result<T, FunctionError> {
    let raw = metafield.map_or("{}", |metafield| metafield.value.as_str());

    Ok(serde_json::from_str(raw)?)
}

/// Check a configured percentage is usable, returning `None` when it disables the discount.
///
/// A missing or `null` percentage disables the discount, the same as zero.
///
/// # Errors
///
/// Returns `FunctionError::PercentageOutOfRange` for negative values or values above 100.
pub fn active_percentage(percentage: Option<Decimal>) -> Result<Option<Decimal>, FunctionError> {
    let Some(percentage) = percentage else {
        return Ok(None);
    };

    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(FunctionError::PercentageOutOfRange(percentage));
    }

    Ok((!percentage.is_zero()).then_some(percentage))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Config {
        #[serde(default)]
        percentage: Option<Decimal>,
    }

    #[test]
    fn missing_metafield_parses_as_empty_object() -> TestResult {
        let config: Config = parse_configuration(None)?;

        assert_eq!(config.percentage, None);

        Ok(())
    }

    #[test]
    fn numeric_percentage_parses() -> TestResult {
        let metafield = Metafield {
            value: r#"{"percentage": 15.5}"#.to_string(),
        };

        let config: Config = parse_configuration(Some(&metafield))?;

        assert_eq!(config.percentage, Some(Decimal::new(155, 1)));

        Ok(())
    }

    #[test]
    fn null_percentage_parses_as_missing() -> TestResult {
        let metafield = Metafield {
            value: r#"{"percentage": null}"#.to_string(),
        };

        let config: Config = parse_configuration(Some(&metafield))?;

        assert_eq!(active_percentage(config.percentage)?, None);

        Ok(())
    }

    #[test]
    fn malformed_metafield_is_an_error() {
        let metafield = Metafield {
            value: "{percentage".to_string(),
        };

        let result: Result<Config, _> = parse_configuration(Some(&metafield));

        assert!(matches!(result, Err(FunctionError::Configuration(_))));
    }

    #[test]
    fn active_percentage_bounds() -> TestResult {
        assert_eq!(active_percentage(None)?, None);
        assert_eq!(active_percentage(Some(Decimal::ZERO))?, None);
        assert_eq!(
            active_percentage(Some(Decimal::from(20)))?,
            Some(Decimal::from(20))
        );
        assert!(matches!(
            active_percentage(Some(Decimal::from(120))),
            Err(FunctionError::PercentageOutOfRange(_))
        ));

        Ok(())
    }

    #[test]
    fn discount_value_serializes_as_nested_percentage() -> TestResult {
        let json = serde_json::to_string(&DiscountValue::percentage(Decimal::from(15)))?;

        assert_eq!(json, r#"{"percentage":{"value":"15"}}"#);

        Ok(())
    }
}
