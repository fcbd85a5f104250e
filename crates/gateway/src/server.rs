use std::{net::SocketAddr, sync::Arc};

use {
    axum::{Router, middleware, routing::get},
    tower_http::trace::TraceLayer,
    tracing::info,
};

use {
    caproxy_config::ProxyConfig,
    caproxy_credential::{CodeArtifactTokenProvider, Refresher, TokenStore},
};

use crate::{
    auth, proxy,
    state::{ProxyState, UPSTREAM_TIMEOUT},
};

/// Build the proxy router (shared between production startup and tests).
pub fn build_app(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/", get(proxy::get_root))
        .route("/{*path}", get(proxy::get_path).post(proxy::post_path))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_basic_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the proxy server.
///
/// Ordering is load-bearing: the first token refresh is awaited before the
/// listener binds, so no request is ever forwarded with an empty store. A
/// failure here is fatal — there is nothing useful to serve without a
/// token. Recurring refresh failures later are logged and absorbed.
pub async fn start(config: ProxyConfig, bind: &str, port: u16) -> anyhow::Result<()> {
    let store = TokenStore::new();
    let provider = Arc::new(CodeArtifactTokenProvider::new(&config).await?);
    let refresher = Refresher::new(provider, store.clone());

    refresher.refresh_once().await?;
    refresher.spawn();

    let http = reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
    let state = ProxyState::new(&config, store, http);
    let app = build_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        domain = %config.domain,
        repository = %config.repository,
        inbound_auth = config.inbound_auth.is_some(),
        "caproxy listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
