//! The lookup endpoints and the client identity they rate-limit on.

use axum::{
    Extension, Json,
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::{ApiError, AppState, types::ApiResponse};
use crate::gateway::EndpointMetadata;
use crate::gateway::validate::RawLookupRequest;
use crate::models::LookupResult;

/// Identity a request is rate-limited under, resolved once per request by
/// [`client_identity_middleware`].
#[derive(Debug, Clone)]
pub struct ClientKey(pub String);

/// Resolve the client identity and stash it in request extensions.
///
/// The socket peer address is the identity. `X-Forwarded-For` is honored
/// only when the peer is a configured trusted proxy; anything else could
/// spoof its way past the limiter. Requests with no peer address at all
/// fall back to a shared `"unknown"` key.
pub async fn client_identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let key = resolve_client_key(
        peer,
        request.headers(),
        &state.config().server.trusted_proxy_ips,
    );
    request.extensions_mut().insert(ClientKey(key));

    next.run(request).await
}

fn resolve_client_key(
    peer: Option<IpAddr>,
    headers: &HeaderMap,
    trusted_proxies: &[String],
) -> String {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match peer {
        Some(peer) => {
            let peer = peer.to_string();
            if let Some(forwarded) = forwarded_for
                && trusted_proxies.iter().any(|proxy| *proxy == peer)
            {
                return forwarded.to_string();
            }
            peer
        }
        None => "unknown".to_string(),
    }
}

/// `POST /api/lookup`
///
/// Runs the full pipeline for the posted criteria and returns the normalized
/// records with their insights.
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<ClientKey>,
    Json(raw): Json<RawLookupRequest>,
) -> Result<Json<LookupResult>, ApiError> {
    let result = state.gateway().lookup(&client.0, &raw).await?;
    Ok(Json(result))
}

/// `GET /api/lookup`
///
/// Static metadata about the endpoint contract; no business logic runs.
pub async fn describe(State(state): State<Arc<AppState>>) -> Json<ApiResponse<EndpointMetadata>> {
    Json(ApiResponse::success(state.gateway().describe()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_peer_address_is_the_default_identity() {
        let peer = Some("203.0.113.9".parse().unwrap());
        let key = resolve_client_key(peer, &HeaderMap::new(), &[]);
        assert_eq!(key, "203.0.113.9");
    }

    #[test]
    fn test_forwarded_header_ignored_from_untrusted_peer() {
        let peer = Some("203.0.113.9".parse().unwrap());
        let headers = headers_with_forwarded("198.51.100.7");
        let key = resolve_client_key(peer, &headers, &["10.0.0.1".to_string()]);
        assert_eq!(key, "203.0.113.9");
    }

    #[test]
    fn test_forwarded_header_honored_from_trusted_proxy() {
        let peer = Some("10.0.0.1".parse().unwrap());
        let headers = headers_with_forwarded("198.51.100.7, 10.0.0.1");
        let key = resolve_client_key(peer, &headers, &["10.0.0.1".to_string()]);
        assert_eq!(key, "198.51.100.7");
    }

    #[test]
    fn test_missing_peer_falls_back_to_shared_key() {
        let key = resolve_client_key(None, &headers_with_forwarded("198.51.100.7"), &[]);
        assert_eq!(key, "unknown");
    }
}
