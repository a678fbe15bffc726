pub mod gateway {

    pub const CACHE_TTL_SECONDS: u32 = 300;

    pub const RATE_LIMIT_WINDOW_SECONDS: u32 = 60;

    pub const RATE_LIMIT_MAX_REQUESTS: u32 = 10;

    pub const MIN_RESULT_LIMIT: u32 = 1;

    pub const MAX_RESULT_LIMIT: u32 = 50;

    pub const DEFAULT_RESULT_LIMIT: u32 = 20;
}

pub mod provider {

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

    /// `source` value stamped on live lookup results.
    pub const SOURCE_NAME: &str = "propertydata";

    /// Sub-resources requested alongside each sale record.
    pub const INCLUDE_FIELDS: &str = "property_details,sale_details,images,market_trends";
}

pub mod placeholder {

    /// `source` value stamped on locally fabricated results so consumers can
    /// tell them apart from provider data.
    pub const SOURCE_NAME: &str = "placeholder";
}
