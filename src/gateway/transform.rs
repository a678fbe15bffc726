//! Normalization of the provider's loosely typed payload into
//! [`PropertyRecord`]s.
//!
//! Provider responses vary: fields may be flat on the record, nested under
//! `sale_details` / `property_details` sub-objects, missing, or carrying the
//! wrong type. Every shape produces a record; anything unusable degrades to
//! a documented default instead of failing the request.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::PropertyRecord;

/// Turn a raw provider payload into normalized records.
///
/// A payload without a `data` array, `{}`, `{"data": null}` and
/// `{"data": []}` included, yields an empty list.
#[must_use]
pub fn transform_payload(
    payload: &Value,
    fallback_postcode: &str,
    now: DateTime<Utc>,
) -> Vec<PropertyRecord> {
    let Some(records) = payload.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    records
        .iter()
        .enumerate()
        .map(|(index, raw)| transform_record(raw, index, fallback_postcode, now))
        .collect()
}

fn transform_record(
    raw: &Value,
    index: usize,
    fallback_postcode: &str,
    now: DateTime<Utc>,
) -> PropertyRecord {
    let sale = raw.get("sale_details").unwrap_or(&Value::Null);
    let details = raw.get("property_details").unwrap_or(&Value::Null);

    let sold_price = num_field(raw, "sold_price")
        .or_else(|| num_field(sale, "sold_price"))
        .unwrap_or(0.0);
    let original_price = num_field(raw, "asking_price")
        .or_else(|| num_field(sale, "asking_price"))
        .unwrap_or(0.0);

    PropertyRecord {
        id: id_field(raw).unwrap_or_else(|| format!("prop_{index}")),
        address: compose_address(raw),
        postcode: str_field(raw, "postcode").unwrap_or_else(|| fallback_postcode.to_string()),
        sold_price,
        original_price,
        sold_date: str_field(raw, "sold_date")
            .or_else(|| str_field(sale, "sold_date"))
            .unwrap_or_else(|| now.to_rfc3339()),
        image: str_field(raw, "image_url").or_else(|| first_image(raw)),
        time_on_market: num_field(raw, "time_on_market").or_else(|| num_field(sale, "time_on_market")),
        property_type: str_field(raw, "property_type")
            .or_else(|| str_field(details, "property_type"))
            .unwrap_or_else(|| "Unknown".to_string()),
        bedrooms: uint_field(raw, "bedrooms").or_else(|| uint_field(details, "bedrooms")),
        bathrooms: uint_field(raw, "bathrooms").or_else(|| uint_field(details, "bathrooms")),
        agent: agent_field(raw),
        price_change: num_field(raw, "price_change")
            .or_else(|| num_field(sale, "price_change"))
            .unwrap_or(sold_price - original_price),
        tenure: str_field(raw, "tenure")
            .or_else(|| str_field(details, "tenure"))
            .unwrap_or_else(|| "Unknown".to_string()),
        epc_rating: str_field(raw, "epc_rating").or_else(|| str_field(details, "epc_rating")),
        price_per_sq_ft: num_field(raw, "price_per_sq_ft")
            .or_else(|| num_field(details, "price_per_sq_ft")),
        market_trend: market_trend_field(raw),
        days_on_market: num_field(raw, "days_on_market").or_else(|| num_field(sale, "days_on_market")),
    }
}

/// House number plus street name when either is present, then the provider's
/// preformatted display address, then `"Unknown"`.
fn compose_address(raw: &Value) -> String {
    let house = str_field(raw, "house_number").unwrap_or_default();
    let street = str_field(raw, "street_name").unwrap_or_default();
    let composed = format!("{house} {street}").trim().to_string();

    if !composed.is_empty() {
        return composed;
    }

    str_field(raw, "display_address").unwrap_or_else(|| "Unknown".to_string())
}

/// Record identifiers arrive as strings or bare numbers depending on the
/// provider endpoint version.
fn id_field(raw: &Value) -> Option<String> {
    match raw.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => str_field(raw, "transaction_id"),
    }
}

fn agent_field(raw: &Value) -> String {
    str_field(raw, "agent")
        .or_else(|| {
            let agent = raw.get("agent").unwrap_or(&Value::Null);
            str_field(agent, "name")
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

fn market_trend_field(raw: &Value) -> String {
    str_field(raw, "market_trend")
        .or_else(|| {
            let trends = raw.get("market_trends").unwrap_or(&Value::Null);
            str_field(trends, "direction")
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

fn first_image(raw: &Value) -> Option<String> {
    raw.get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn num_field(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

fn uint_field(raw: &Value, key: &str) -> Option<u32> {
    raw.get(key)
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok())
}
