use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

use super::types::ErrorBody;
use crate::gateway::GatewayError;
use crate::gateway::validate::FieldError;

#[derive(Debug)]
pub enum ApiError {
    ValidationFailed(Vec<FieldError>),

    RateLimited { retry_after_secs: u64 },

    UpstreamTimeout,

    UpstreamError { status: u16, body: String },

    ConfigurationError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationFailed(errors) => {
                write!(f, "Validation failed with {} error(s)", errors.len())
            }
            ApiError::RateLimited { retry_after_secs } => {
                write!(f, "Rate limit exceeded, retry in {}s", retry_after_secs)
            }
            ApiError::UpstreamTimeout => write!(f, "Property data request timed out"),
            ApiError::UpstreamError { status, .. } => {
                write!(f, "Provider returned status {}", status)
            }
            ApiError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ValidationFailed(errors) => {
                let body = ErrorBody::with_fields("Validation failed", errors);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::RateLimited { retry_after_secs } => {
                let body = ErrorBody::new(format!(
                    "Rate limit exceeded. Try again in {} seconds",
                    retry_after_secs
                ));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            ApiError::UpstreamTimeout => {
                let body = ErrorBody::new("Property data request timed out");
                (StatusCode::REQUEST_TIMEOUT, Json(body)).into_response()
            }
            ApiError::UpstreamError { status, body } => {
                tracing::warn!("Provider error {}: {}", status, body);
                let body = ErrorBody::new("Property data provider returned an error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::ConfigurationError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                let body = ErrorBody::new("An internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                let body = ErrorBody::new("An internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(errors) => ApiError::ValidationFailed(errors),
            GatewayError::RateLimited { retry_after_secs } => {
                ApiError::RateLimited { retry_after_secs }
            }
            GatewayError::UpstreamTimeout => ApiError::UpstreamTimeout,
            GatewayError::Upstream { status, body } => ApiError::UpstreamError { status, body },
            GatewayError::Configuration(msg) => ApiError::ConfigurationError(msg),
            GatewayError::Unknown(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
