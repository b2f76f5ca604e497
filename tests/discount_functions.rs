//! Integration tests for the product and order exclusion functions.
//!
//! Both functions read the same cart:
//!
//! - `gid://shopify/CartLine/1`: lace front wig, in a configured collection
//! - `gid://shopify/CartLine/2`: silk cap, in a configured collection, clearance
//! - `gid://shopify/CartLine/3`: topper, outside the configured collections
//! - `gid://shopify/CartLine/4`: bonnet, tagged `final-sale`
//! - `gid://shopify/CartLine/5`: custom engraving, not a product variant

use rust_decimal::Decimal;
use serde_json::{Value, json};
use testresult::TestResult;

use tress::prelude::*;

fn variant_line(id: u32, amount: &str, in_collection: bool, tagged: bool, clearance: bool) -> Value {
    let metafield = if clearance {
        json!({"value": "true"})
    } else {
        Value::Null
    };

    json!({
        "id": format!("gid://shopify/CartLine/{id}"),
        "quantity": 1,
        "cost": {"amountPerQuantity": {"amount": amount, "currencyCode": "USD"}},
        "merchandise": {
            "__typename": "ProductVariant",
            "id": format!("gid://shopify/ProductVariant/{id}"),
            "metafield": metafield,
            "product": {"inAnyCollection": in_collection, "hasAnyTag": tagged}
        }
    })
}

fn cart() -> Value {
    json!({
        "lines": [
            variant_line(1, "189.00", true, false, false),
            variant_line(2, "30.00", true, false, true),
            variant_line(3, "79.00", false, false, false),
            variant_line(4, "12.50", true, true, false),
            {
                "id": "gid://shopify/CartLine/5",
                "quantity": 1,
                "cost": {"amountPerQuantity": {"amount": "5.00", "currencyCode": "USD"}},
                "merchandise": {"__typename": "CustomProduct"}
            }
        ]
    })
}

fn metafield(config: &Value) -> Value {
    json!({"value": config.to_string()})
}

#[test]
fn product_discount_targets_eligible_non_clearance_lines() -> TestResult {
    let input: ProductDiscountInput = serde_json::from_value(json!({
        "cart": cart(),
        "discountNode": {"metafield": metafield(&json!({
            "percentage": 20,
            "collections": ["gid://shopify/Collection/wigs"],
            "productTags": ["final-sale"]
        }))}
    }))?;

    let result = product::run(&input)?;

    assert_eq!(
        serde_json::to_value(&result)?,
        json!({
            "discounts": [{
                "targets": [{"cartLine": {"id": "gid://shopify/CartLine/1"}}],
                "value": {"percentage": {"value": "20"}}
            }],
            "discountApplicationStrategy": "FIRST"
        })
    );

    Ok(())
}

#[test]
fn product_discount_rejects_out_of_range_percentage() -> TestResult {
    let input: ProductDiscountInput = serde_json::from_value(json!({
        "cart": cart(),
        "discountNode": {"metafield": metafield(&json!({"percentage": 120}))}
    }))?;

    assert!(matches!(
        product::run(&input),
        Err(FunctionError::PercentageOutOfRange(value)) if value == Decimal::from(120)
    ));

    Ok(())
}

#[test]
fn product_discount_rejects_malformed_configuration() -> TestResult {
    let input: ProductDiscountInput = serde_json::from_value(json!({
        "cart": cart(),
        "discountNode": {"metafield": {"value": "{not json"}}
    }))?;

    assert!(matches!(
        product::run(&input),
        Err(FunctionError::Configuration(_))
    ));

    Ok(())
}

#[test]
fn order_discount_excludes_ineligible_lines() -> TestResult {
    let input: OrderDiscountInput = serde_json::from_value(json!({
        "cart": cart(),
        "discount": {
            "discountClasses": ["ORDER"],
            "metafield": metafield(&json!({
                "orderPercentage": 12.5,
                "collectionIds": ["gid://shopify/Collection/wigs"],
                "productTags": ["final-sale"],
                "excludeClearance": true
            }))
        }
    }))?;

    let result = order::run(&input)?;

    let excluded: Vec<&str> = result.excluded_cart_line_ids().collect();

    assert_eq!(
        excluded,
        [
            "gid://shopify/CartLine/2",
            "gid://shopify/CartLine/3",
            "gid://shopify/CartLine/4",
            "gid://shopify/CartLine/5",
        ]
    );
    assert_eq!(result.percentage(), Some(Decimal::new(125, 1)));

    Ok(())
}

#[test]
fn order_discount_keeps_clearance_unless_configured() -> TestResult {
    let input: OrderDiscountInput = serde_json::from_value(json!({
        "cart": cart(),
        "discount": {
            "discountClasses": ["ORDER"],
            "metafield": metafield(&json!({"percentage": 10}))
        }
    }))?;

    let result = order::run(&input)?;

    assert!(
        !result
            .excluded_cart_line_ids()
            .any(|id| id == "gid://shopify/CartLine/2"),
        "clearance line stays in the subtotal"
    );

    Ok(())
}

#[test]
fn order_discount_without_order_class_is_empty() -> TestResult {
    let input: OrderDiscountInput = serde_json::from_value(json!({
        "cart": cart(),
        "discount": {
            "discountClasses": ["PRODUCT"],
            "metafield": metafield(&json!({"percentage": 10}))
        }
    }))?;

    assert!(order::run(&input)?.operations.is_empty());

    Ok(())
}
