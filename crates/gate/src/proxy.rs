//! Downstream forwarding for the standalone server
//!
//! Authorized requests are relayed to the upstream service as they came in.
//! The gate adds nothing to them: no token, no identity header.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use http_body_util::LengthLimitError;
use reqwest::Client;
use tower_http::trace::TraceLayer;

use crate::auth::{protect, AuthGate};

/// Largest request body relayed upstream
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that only make sense for a single hop
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone)]
pub struct ProxyState {
    pub http_client: Client,
    /// Upstream origin without trailing slash
    pub upstream_url: String,
}

impl ProxyState {
    pub fn new(upstream_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            upstream_url: upstream_url.into(),
        }
    }
}

/// Every path forwarded upstream, all of it behind the gate.
pub fn router(gate: Arc<AuthGate>, state: ProxyState) -> Router {
    let routes = Router::new().fallback(forward).with_state(state);
    protect(routes, gate).layer(TraceLayer::new_for_http())
}

/// Relay the request upstream and the upstream answer back.
pub async fn forward(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.upstream_url, path_and_query);

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) if exceeds_length_limit(&e) => {
            tracing::warn!(url = %url, limit = MAX_BODY_BYTES, "forward: request body too large");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "forward: unable to read request body");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    let mut headers = parts.headers;
    strip_hop_headers(&mut headers);
    headers.remove(header::HOST);

    let upstream = state
        .http_client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url = %url, error = %e, "forward: upstream request failed");
            return bad_gateway();
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_headers(&mut headers);

    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            tracing::error!(url = %url, error = %e, "forward: failed to read upstream body");
            bad_gateway()
        }
    }
}

/// Drop per-hop headers and the length, which is recomputed for the new body.
fn strip_hop_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::CONTENT_LENGTH);
}

/// Whether reading the body stopped at `MAX_BODY_BYTES` rather than on a body error.
fn exceeds_length_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
}
