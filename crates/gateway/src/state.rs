use std::{sync::Arc, time::Duration};

use caproxy_config::{InboundAuth, ProxyConfig};
use caproxy_credential::TokenStore;

use crate::upstream::UpstreamConfig;

/// Bound on upstream calls. The original behavior had none; without it one
/// stalled upstream connection pins a handler forever.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared proxy runtime state, wrapped in `Arc` for use across handlers and
/// the refresher task.
pub struct ProxyState {
    /// Current upstream token; written by the refresher, snapshotted once
    /// per request.
    pub store: TokenStore,
    pub upstream: UpstreamConfig,
    /// Shared client for upstream calls.
    pub http: reqwest::Client,
    /// Inbound basic-auth gate; `None` disables gating.
    pub inbound_auth: Option<InboundAuth>,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig, store: TokenStore, http: reqwest::Client) -> Arc<Self> {
        Arc::new(Self {
            store,
            upstream: UpstreamConfig::from_config(config),
            http,
            inbound_auth: config.inbound_auth.clone(),
        })
    }
}
