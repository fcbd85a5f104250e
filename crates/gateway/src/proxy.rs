//! Per-request forwarding: snapshot the current token, build the upstream
//! URL, dispatch, and relay the upstream status and body verbatim.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, State},
        http::{Method, StatusCode},
        response::{IntoResponse, Response},
    },
    thiserror::Error,
    tracing::{info, warn},
};

use crate::{state::ProxyState, upstream::build_upstream_url};

#[derive(Debug, Error)]
pub enum ProxyError {
    /// A request arrived before the first successful refresh installed a
    /// token. Failing fast here is what keeps an unauthenticated request
    /// from ever reaching the upstream.
    #[error("no upstream token installed yet")]
    MissingToken,
    #[error("upstream request failed")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingToken => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        warn!(error = %self, "request not forwarded");
        (status, self.to_string()).into_response()
    }
}

/// `GET /` — forward the repository index root.
pub async fn get_root(State(state): State<Arc<ProxyState>>) -> Result<Response, ProxyError> {
    forward(state, Method::GET, "", None).await
}

/// `GET /{path}` — forward with no body.
pub async fn get_path(
    State(state): State<Arc<ProxyState>>,
    Path(path): Path<String>,
) -> Result<Response, ProxyError> {
    forward(state, Method::GET, &path, None).await
}

/// `POST /{path}` — forward the inbound JSON payload.
pub async fn post_path(
    State(state): State<Arc<ProxyState>>,
    Path(path): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ProxyError> {
    forward(state, Method::POST, &path, Some(body)).await
}

async fn forward(
    state: Arc<ProxyState>,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
) -> Result<Response, ProxyError> {
    info!(%method, path, "forwarding request");

    // One snapshot per request: the refresher may replace the store at any
    // later instant without affecting this request.
    let token = state.store.read().await.ok_or(ProxyError::MissingToken)?;
    let url = build_upstream_url(path, &token, &state.upstream);

    let request = match body {
        None => state.http.get(&url),
        Some(json) => state.http.post(&url).json(&json),
    };

    let upstream = request.send().await?;
    let status = upstream.status();
    let bytes = upstream.bytes().await?;

    // Upstream's status and body pass through untranslated, 2xx or not.
    Ok((status, bytes).into_response())
}
