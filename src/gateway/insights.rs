//! Summary statistics over a batch of normalized records.

use std::collections::HashMap;

use crate::models::{Insights, PriceRange, PropertyRecord};

/// Aggregate the batch into [`Insights`].
///
/// The median is the element at index `floor(N / 2)` of the ascending price
/// sort, which for even N is the upper of the two middle values. Records
/// without a time-on-market figure count as zero in that average. The sort
/// happens on a locally collected price vector, so the caller's slice is
/// never reordered.
#[must_use]
pub fn compute_insights(records: &[PropertyRecord]) -> Insights {
    if records.is_empty() {
        return Insights::default();
    }

    let count = records.len();
    let mut property_types: HashMap<String, usize> = HashMap::new();
    let mut price_sum = 0.0;
    let mut time_sum = 0.0;
    let mut min_price = f64::INFINITY;
    let mut max_price = f64::NEG_INFINITY;

    for record in records {
        price_sum += record.sold_price;
        time_sum += record.time_on_market.unwrap_or(0.0);
        min_price = min_price.min(record.sold_price);
        max_price = max_price.max(record.sold_price);
        *property_types.entry(record.property_type.clone()).or_insert(0) += 1;
    }

    let mut prices: Vec<f64> = records.iter().map(|r| r.sold_price).collect();
    prices.sort_by(f64::total_cmp);
    let median_price = prices[count / 2];

    Insights {
        average_price: price_sum / count as f64,
        median_price,
        average_time_on_market: time_sum / count as f64,
        price_range: Some(PriceRange {
            min: min_price,
            max: max_price,
        }),
        property_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(sold_price: f64, property_type: &str, time_on_market: Option<f64>) -> PropertyRecord {
        PropertyRecord {
            id: "test".to_string(),
            address: "1 Test Street".to_string(),
            postcode: "SW1A1AA".to_string(),
            sold_price,
            original_price: sold_price,
            sold_date: Utc::now().to_rfc3339(),
            image: None,
            time_on_market,
            property_type: property_type.to_string(),
            bedrooms: None,
            bathrooms: None,
            agent: "Unknown".to_string(),
            price_change: 0.0,
            tenure: "Unknown".to_string(),
            epc_rating: None,
            price_per_sq_ft: None,
            market_trend: "Unknown".to_string(),
            days_on_market: None,
        }
    }

    #[test]
    fn test_empty_batch_yields_zero_insights() {
        let insights = compute_insights(&[]);

        assert_eq!(insights.average_price, 0.0);
        assert_eq!(insights.median_price, 0.0);
        assert_eq!(insights.average_time_on_market, 0.0);
        assert_eq!(insights.price_range, None);
        assert!(insights.property_types.is_empty());
    }

    #[test]
    fn test_even_count_takes_upper_median() {
        let records = vec![
            record(100_000.0, "Flat", None),
            record(200_000.0, "Flat", None),
        ];

        let insights = compute_insights(&records);
        assert_eq!(insights.median_price, 200_000.0);
        assert_eq!(insights.average_price, 150_000.0);
    }

    #[test]
    fn test_odd_count_takes_middle_of_sorted_prices() {
        // Deliberately unsorted input: the median must sort ascending first.
        let records = vec![
            record(500_000.0, "Detached", None),
            record(100_000.0, "Flat", None),
            record(300_000.0, "Terraced", None),
        ];

        let insights = compute_insights(&records);
        assert_eq!(insights.median_price, 300_000.0);
        assert_eq!(insights.average_price, 300_000.0);
    }

    #[test]
    fn test_price_range_spans_min_and_max() {
        let records = vec![
            record(250_000.0, "Flat", None),
            record(900_000.0, "Detached", None),
            record(420_000.0, "Terraced", None),
        ];

        let range = compute_insights(&records).price_range.unwrap();
        assert_eq!(range.min, 250_000.0);
        assert_eq!(range.max, 900_000.0);
    }

    #[test]
    fn test_single_record_is_its_own_range_and_median() {
        let records = vec![record(333_000.0, "Bungalow", Some(12.0))];

        let insights = compute_insights(&records);
        assert_eq!(insights.median_price, 333_000.0);
        assert_eq!(insights.average_price, 333_000.0);
        let range = insights.price_range.unwrap();
        assert_eq!(range.min, 333_000.0);
        assert_eq!(range.max, 333_000.0);
    }

    #[test]
    fn test_missing_time_on_market_counts_as_zero() {
        let records = vec![
            record(100_000.0, "Flat", Some(30.0)),
            record(100_000.0, "Flat", None),
        ];

        let insights = compute_insights(&records);
        assert_eq!(insights.average_time_on_market, 15.0);
    }

    #[test]
    fn test_property_types_histogram() {
        let records = vec![
            record(1.0, "Flat", None),
            record(2.0, "Flat", None),
            record(3.0, "Terraced", None),
        ];

        let insights = compute_insights(&records);
        assert_eq!(insights.property_types.get("Flat"), Some(&2));
        assert_eq!(insights.property_types.get("Terraced"), Some(&1));
        assert_eq!(insights.property_types.len(), 2);
    }
}
