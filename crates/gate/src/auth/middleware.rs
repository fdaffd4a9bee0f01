//! Authentication middleware for Axum

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::WWW_AUTHENTICATE, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use super::gate::AuthGate;

/// Middleware that requires credentials accepted by the identity service.
///
/// Authorized requests reach `next` untouched; everything else gets the same
/// 401 challenge so callers learn nothing about why they were refused.
pub async fn require_identity(
    State(gate): State<Arc<AuthGate>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match gate.authorize(request.headers()).await {
        Ok(authorized) => {
            tracing::info!(
                path = %path,
                username = %authorized.username,
                identity = ?authorized.identity,
                "require_identity: request authorized"
            );
            next.run(request).await
        }
        Err(rejection) => {
            tracing::warn!(
                path = %path,
                stage = ?rejection.stage,
                error = %rejection.error,
                "require_identity: request rejected"
            );
            unauthorized(&gate)
        }
    }
}

/// 401 with a basic auth challenge for the gate's realm
pub fn unauthorized(gate: &AuthGate) -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized.").into_response();
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, gate.challenge().clone());
    response
}

/// Put every route of `router` behind the gate.
pub fn protect<S>(router: Router<S>, gate: Arc<AuthGate>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gate, require_identity))
}
