//! Locally fabricated sample results.
//!
//! Consumers that need something to render when the gateway cannot answer
//! can ask for a sample batch. These results never pass through the lookup
//! pipeline or its cache, and they are stamped with their own `source` value
//! so they can always be told apart from provider data.

use chrono::{Duration, Utc};
use rand::Rng;

use crate::constants;
use crate::gateway::insights::compute_insights;
use crate::models::{LookupResult, PropertyRecord};

const STREETS: &[&str] = &[
    "High Street",
    "Station Road",
    "Church Lane",
    "Victoria Road",
    "Mill Lane",
    "Kings Road",
];

const PROPERTY_TYPES: &[&str] = &["Terraced", "Semi-Detached", "Detached", "Flat"];

const AGENTS: &[&str] = &["Foxtons", "Savills", "Purplebricks", "Knight Frank"];

/// Generate `count` plausible sold records for the given postcode, with real
/// insights computed over them.
#[must_use]
pub fn sample_result(postcode: &str, count: usize) -> LookupResult {
    let mut rng = rand::rng();
    let now = Utc::now();

    let properties: Vec<PropertyRecord> = (0..count)
        .map(|index| {
            let sold_price = f64::from(rng.random_range(250_u32..=1250)) * 1000.0;
            let original_price = (sold_price * rng.random_range(0.9..=1.1)).round();
            let days = f64::from(rng.random_range(14_u32..=90));

            PropertyRecord {
                id: format!("sample_{index}"),
                address: format!(
                    "{} {}",
                    rng.random_range(1_u32..=120),
                    STREETS[index % STREETS.len()]
                ),
                postcode: postcode.to_string(),
                sold_price,
                original_price,
                sold_date: (now - Duration::days(i64::from(rng.random_range(1_u32..=30))))
                    .to_rfc3339(),
                image: None,
                time_on_market: Some(days),
                property_type: PROPERTY_TYPES[index % PROPERTY_TYPES.len()].to_string(),
                bedrooms: Some(rng.random_range(1..=5)),
                bathrooms: Some(rng.random_range(1..=3)),
                agent: AGENTS[index % AGENTS.len()].to_string(),
                price_change: sold_price - original_price,
                tenure: "Freehold".to_string(),
                epc_rating: None,
                price_per_sq_ft: None,
                market_trend: "stable".to_string(),
                days_on_market: Some(days),
            }
        })
        .collect();

    let insights = compute_insights(&properties);

    LookupResult {
        success: true,
        total: properties.len(),
        postcode: postcode.to_string(),
        source: constants::placeholder::SOURCE_NAME.to_string(),
        timestamp: now,
        cached: false,
        properties,
        insights,
    }
}
