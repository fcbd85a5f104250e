//! Environment-driven configuration for the proxy.
//!
//! The service is configured entirely through environment variables so it
//! runs unchanged in a container. The required variables identify the
//! upstream CodeArtifact repository; missing any of them prevents startup.

use secrecy::SecretString;
use thiserror::Error;
use tracing::debug;

// ── Environment variables ────────────────────────────────────────────────────

pub const ENV_REGION: &str = "CODEARTIFACT_REGION";
pub const ENV_ACCOUNT_ID: &str = "CODEARTIFACT_ACCOUNT_ID";
pub const ENV_DOMAIN: &str = "CODEARTIFACT_DOMAIN";
pub const ENV_REPOSITORY: &str = "CODEARTIFACT_REPOSITORY";
pub const ENV_PROXY_AUTH: &str = "PROXY_AUTH";
pub const ENV_PROXY_PORT: &str = "PROXY_PORT";

pub const DEFAULT_PORT: u16 = 5000;

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("PROXY_AUTH must be `username:password`")]
    InvalidAuth,
    #[error("PROXY_PORT is not a valid port: {0}")]
    InvalidPort(String),
}

/// Inbound basic-auth credentials, parsed from `PROXY_AUTH=user:password`.
#[derive(Debug, Clone)]
pub struct InboundAuth {
    pub username: String,
    pub password: SecretString,
}

/// Everything the proxy needs to know at startup.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub region: String,
    pub account_id: String,
    pub domain: String,
    pub repository: String,
    /// When set, every inbound request must present matching basic auth.
    pub inbound_auth: Option<InboundAuth>,
    pub port: u16,
}

// ── Loading ──────────────────────────────────────────────────────────────────

impl ProxyConfig {
    /// Load from process environment. Fatal on missing required variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary lookup function. Tests pass a map here so they
    /// never mutate process-wide environment state.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let inbound_auth = lookup(ENV_PROXY_AUTH)
            .map(|raw| parse_inbound_auth(&raw))
            .transpose()?;

        let port = match lookup(ENV_PROXY_PORT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let config = Self {
            region: required(ENV_REGION)?,
            account_id: required(ENV_ACCOUNT_ID)?,
            domain: required(ENV_DOMAIN)?,
            repository: required(ENV_REPOSITORY)?,
            inbound_auth,
            port,
        };
        debug!(
            region = %config.region,
            domain = %config.domain,
            repository = %config.repository,
            inbound_auth = config.inbound_auth.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }
}

fn parse_inbound_auth(raw: &str) -> Result<InboundAuth, ConfigError> {
    let (username, password) = raw.split_once(':').ok_or(ConfigError::InvalidAuth)?;
    if username.is_empty() {
        return Err(ConfigError::InvalidAuth);
    }
    Ok(InboundAuth {
        username: username.to_string(),
        password: SecretString::new(password.to_string()),
    })
}
