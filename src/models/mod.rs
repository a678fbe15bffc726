pub mod property;

pub use property::{Insights, LookupRequest, LookupResult, PriceRange, PropertyRecord, Timeframe};
