//! Data model for sold-property lookups.
//!
//! [`LookupRequest`] is the validated form of an inbound query and carries the
//! canonical cache key. [`PropertyRecord`] and [`Insights`] make up the
//! normalized response payload; both serialize in camelCase for the ticker
//! front-end and are never mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sliding window of sales to query, counted back from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    Day,
    Week,
    #[default]
    Month,
    Quarter,
}

impl Timeframe {
    pub const ALL: [Self; 4] = [Self::Day, Self::Week, Self::Month, Self::Quarter];

    /// Wire form accepted in requests and used in cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "24hours",
            Self::Week => "7days",
            Self::Month => "30days",
            Self::Quarter => "90days",
        }
    }

    /// Period token understood by the provider's sales-search endpoint.
    #[must_use]
    pub const fn provider_period(self) -> &'static str {
        match self {
            Self::Day => "last_24_hours",
            Self::Week => "last_7_days",
            Self::Month => "last_30_days",
            Self::Quarter => "last_90_days",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "24hours" => Some(Self::Day),
            "7days" => Some(Self::Week),
            "30days" => Some(Self::Month),
            "90days" => Some(Self::Quarter),
            _ => None,
        }
    }
}

/// A fully validated lookup query.
///
/// `postcode` is always the normalized form: uppercased with all whitespace
/// removed. Construction goes through the validator, which is what upholds
/// that invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub postcode: String,
    pub limit: u32,
    pub timeframe: Timeframe,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl LookupRequest {
    /// Canonical cache key: fixed field order so logically identical requests
    /// always collide.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.postcode,
            self.limit,
            self.timeframe.as_str(),
            self.price_min.map_or_else(|| "-".to_string(), |v| v.to_string()),
            self.price_max.map_or_else(|| "-".to_string(), |v| v.to_string()),
        )
    }
}

/// One normalized sold-property entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub id: String,
    pub address: String,
    pub postcode: String,
    pub sold_price: f64,
    pub original_price: f64,
    pub sold_date: String,
    pub image: Option<String>,
    pub time_on_market: Option<f64>,
    pub property_type: String,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub agent: String,
    pub price_change: f64,
    pub tenure: String,
    pub epc_rating: Option<String>,
    pub price_per_sq_ft: Option<f64>,
    pub market_trend: String,
    pub days_on_market: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Summary statistics over one lookup's records.
///
/// `price_range` is `None` for an empty record set rather than a sentinel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub average_price: f64,
    pub median_price: f64,
    pub average_time_on_market: f64,
    pub price_range: Option<PriceRange>,
    pub property_types: HashMap<String, usize>,
}

/// The gateway's response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub success: bool,
    pub properties: Vec<PropertyRecord>,
    pub insights: Insights,
    pub total: usize,
    pub postcode: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::parse("24hours"), Some(Timeframe::Day));
        assert_eq!(Timeframe::parse("90days"), Some(Timeframe::Quarter));
        assert_eq!(Timeframe::parse("1year"), None);
        assert_eq!(Timeframe::parse(""), None);
        assert_eq!(Timeframe::default(), Timeframe::Month);
    }

    #[test]
    fn test_cache_key_is_canonical() {
        let request = LookupRequest {
            postcode: "SW1A1AA".to_string(),
            limit: 20,
            timeframe: Timeframe::Month,
            price_min: None,
            price_max: Some(500_000.0),
        };

        assert_eq!(request.cache_key(), "SW1A1AA|20|30days|-|500000");
        assert_eq!(request.cache_key(), request.clone().cache_key());

        let other = LookupRequest {
            limit: 21,
            ..request
        };
        assert_ne!(other.cache_key(), "SW1A1AA|20|30days|-|500000");
    }
}
