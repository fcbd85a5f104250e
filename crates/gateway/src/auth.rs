//! Optional inbound basic auth in front of the forwarding handlers.
//!
//! Configured via `PROXY_AUTH=user:password`; when unset, no gating is
//! applied. This layer sits entirely in front of the forwarding path and
//! never touches the upstream token.

use std::sync::Arc;

use {
    axum::{
        extract::{Request, State},
        http::{StatusCode, header},
        middleware::Next,
        response::{IntoResponse, Response},
    },
    base64::Engine,
    secrecy::ExposeSecret,
};

use caproxy_config::InboundAuth;

use crate::state::ProxyState;

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    // XOR each byte and accumulate; any difference makes result non-zero.
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

/// Check an `Authorization: Basic …` header value against the configured pair.
fn authorized(auth: &InboundAuth, header_value: Option<&str>) -> bool {
    let Some(value) = header_value else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        return false;
    };
    safe_equal(username, &auth.username) && safe_equal(password, auth.password.expose_secret())
}

/// Middleware gating every route when `PROXY_AUTH` is configured.
pub async fn require_basic_auth(
    State(state): State<Arc<ProxyState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth) = &state.inbound_auth else {
        return next.run(request).await;
    };

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if authorized(auth, header_value) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"caproxy\"")],
            "unauthorized",
        )
            .into_response()
    }
}
