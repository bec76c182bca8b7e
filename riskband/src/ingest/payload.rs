// riskband/src/ingest/payload.rs
//
// JSON sub-payloads carried in the `shipping_info` and `cart_info` columns.
//
//   shipping_info: {"ShippingAddress": {"shippingcountry": .., ...},
//                   "BillingAddress":  {"billingzipcode": ..}}
//   cart_info:     {"CartProduct": {"all": [{"productPrice": ..,
//                                            "productQuantity": ..,
//                                            "productType": ..}, ...]}}
//
// A payload that is not valid JSON is read as an empty object. Scalars are
// kept as their string form so `94107` and `"94107"` compare equal.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::records::{CartInfo, ShippingInfo};

fn parse_or_empty(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null      => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b)   => Some(b.to_string()),
        other            => Some(other.to_string()),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn parse_shipping(raw: &str) -> ShippingInfo {
    let info    = parse_or_empty(raw);
    let address = info.get("ShippingAddress");
    let field   = |key: &str| address.and_then(|a| a.get(key)).and_then(scalar);

    ShippingInfo {
        country:     field("shippingcountry"),
        zipcode:     field("shippingzipcode"),
        street:      format!(
            "{} {}",
            field("shippingstreet").unwrap_or_default(),
            field("shippingstreet2").unwrap_or_default(),
        ),
        state:       field("shippingstate"),
        phone:       field("shippingphonenumber"),
        first_name:  field("shippingnamefirst"),
        last_name:   field("shippingnamelast"),
        billing_zip: info.get("BillingAddress")
            .and_then(|b| b.get("billingzipcode"))
            .and_then(scalar),
    }
}

/// price × quantity; a missing or non-numeric part makes the line worth 0.
fn line_total(product: &Value) -> f64 {
    match (number(product.get("productPrice")), number(product.get("productQuantity"))) {
        (Some(price), Some(quantity)) if (price * quantity).is_finite() => price * quantity,
        _ => 0.0,
    }
}

pub fn parse_cart(raw: &str) -> CartInfo {
    let info = parse_or_empty(raw);
    let products: &[Value] = info
        .get("CartProduct")
        .and_then(|c| c.get("all"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let total_amount = products.iter().map(line_total).sum();
    let product_types: BTreeSet<String> = products
        .iter()
        .filter_map(|p| p.get("productType").and_then(scalar))
        .flat_map(|t| t.split(',').map(str::trim).map(String::from).collect::<Vec<_>>())
        .filter(|t| !t.is_empty())
        .collect();

    CartInfo { total_amount, product_types }
}
