//! Static bearer token authentication.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingHeader,
    Unauthorized,
}

impl AuthRejection {
    fn message(self) -> &'static str {
        match self {
            AuthRejection::MissingHeader => "Authorization header missing",
            AuthRejection::Unauthorized => "Unauthorized",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": self.message() })),
        )
            .into_response()
    }
}

/// Checks `Authorization: Bearer <token>` when a token is configured.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    token: Option<Arc<str>>,
}

impl AuthGate {
    /// An empty token disables the gate.
    pub fn new(token: Option<&str>) -> Self {
        if token == Some("") {
            tracing::warn!("static_bearer_token is empty, /metrics authentication is disabled");
        }
        Self {
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<(), AuthRejection> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };

        let value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthRejection::MissingHeader)?
            .to_str()
            .map_err(|_| AuthRejection::Unauthorized)?;
        if value.is_empty() {
            return Err(AuthRejection::MissingHeader);
        }

        let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
        if !scheme.eq_ignore_ascii_case("bearer") || token != expected {
            return Err(AuthRejection::Unauthorized);
        }
        Ok(())
    }
}

/// Axum middleware enforcing the gate on every request.
pub async fn auth_middleware(
    State(gate): State<AuthGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match gate.check(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::debug!(reason = rejection.message(), path = %request.uri().path(), "Rejected request");
            rejection.into_response()
        }
    }
}
