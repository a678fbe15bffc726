//! Request validation for the lookup endpoint.
//!
//! Validation is collecting, not short-circuiting: every violated constraint
//! in a request is reported in one pass so clients can fix all of them at
//! once.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::sync::OnceLock;

use crate::constants::gateway::{DEFAULT_RESULT_LIMIT, MAX_RESULT_LIMIT, MIN_RESULT_LIMIT};
use crate::models::{LookupRequest, Timeframe};

/// Inbound lookup payload exactly as the client sent it, before any
/// constraint has been checked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLookupRequest {
    pub postcode: Option<String>,
    /// Kept as a raw number so fractional values reach validation instead of
    /// failing body deserialization.
    pub limit: Option<Number>,
    pub timeframe: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

/// A single violated constraint, tied to the field that violated it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// UK postcode shape: one or two letters, a digit, an optional alphanumeric,
/// then the inward part of a digit and two letters. The space is optional and
/// matching is case-insensitive.
fn postcode_regex() -> Option<&'static regex::Regex> {
    static INSTANCE: OnceLock<Option<regex::Regex>> = OnceLock::new();
    INSTANCE
        .get_or_init(|| regex::Regex::new(r"^[A-Za-z]{1,2}[0-9][0-9A-Za-z]?\s?[0-9][A-Za-z]{2}$").ok())
        .as_ref()
}

/// Uppercase and strip all whitespace, e.g. `"sw1a 1aa"` to `"SW1A1AA"`.
fn normalize_postcode(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// A usable limit is any JSON number holding a whole value inside the
/// configured bounds; `20` and `20.0` both qualify, `20.5` and `51` do not.
fn whole_number_limit(value: &Number) -> Option<u32> {
    let limit = if let Some(whole) = value.as_i64() {
        u32::try_from(whole).ok()?
    } else {
        let float = value.as_f64()?;
        if float.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&float) {
            return None;
        }
        float as u32
    };

    (MIN_RESULT_LIMIT..=MAX_RESULT_LIMIT)
        .contains(&limit)
        .then_some(limit)
}

/// Check every constraint on the raw payload and produce a normalized
/// [`LookupRequest`].
///
/// An out-of-range or fractional `limit` is rejected, never clamped or
/// rounded. An omitted `limit` falls back to [`DEFAULT_RESULT_LIMIT`] and an
/// omitted `timeframe` to the default period. Price bounds pass through
/// unchecked; the provider applies them as filters even when inverted.
///
/// # Errors
///
/// Returns the full list of violated constraints when any field fails.
pub fn validate(raw: &RawLookupRequest) -> Result<LookupRequest, Vec<FieldError>> {
    let mut errors = Vec::new();

    let postcode = match raw.postcode.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError::new("postcode", "postcode is required"));
            None
        }
        Some(trimmed) => {
            if postcode_regex().is_some_and(|re| re.is_match(trimmed)) {
                Some(normalize_postcode(trimmed))
            } else {
                errors.push(FieldError::new(
                    "postcode",
                    format!("'{trimmed}' is not a valid UK postcode"),
                ));
                None
            }
        }
    };

    let limit = match raw.limit.as_ref() {
        None => DEFAULT_RESULT_LIMIT,
        Some(value) => match whole_number_limit(value) {
            Some(limit) => limit,
            None => {
                errors.push(FieldError::new(
                    "limit",
                    format!(
                        "limit must be a whole number between {MIN_RESULT_LIMIT} and {MAX_RESULT_LIMIT}, got {value}"
                    ),
                ));
                DEFAULT_RESULT_LIMIT
            }
        },
    };

    let timeframe = match raw.timeframe.as_deref() {
        None => Timeframe::default(),
        Some(value) => match Timeframe::parse(value) {
            Some(timeframe) => timeframe,
            None => {
                errors.push(FieldError::new(
                    "timeframe",
                    format!("'{value}' is not a supported timeframe"),
                ));
                Timeframe::default()
            }
        },
    };

    if let Some(postcode) = postcode
        && errors.is_empty()
    {
        return Ok(LookupRequest {
            postcode,
            limit,
            timeframe,
            price_min: raw.price_min,
            price_max: raw.price_max,
        });
    }

    Err(errors)
}
