//! Upstream token lifecycle.
//!
//! One writer (the recurring [`Refresher`]) and any number of concurrent
//! readers (request handlers) share a single [`TokenStore`] slot. Tokens
//! come from a [`TokenProvider`]; the production implementation calls the
//! CodeArtifact authorization-token endpoint with a SigV4-signed request.

pub mod provider;
pub mod refresher;
pub mod store;
pub mod token;

pub use {
    provider::{CodeArtifactTokenProvider, ProviderError, TOKEN_DURATION_SECS, TokenProvider},
    refresher::{DEFAULT_REFRESH_PERIOD, Refresher},
    store::TokenStore,
    token::AuthToken,
};
