use std::time::{Duration, SystemTime, UNIX_EPOCH};

use {
    async_trait::async_trait,
    aws_config::{BehaviorVersion, Region, ecs::EcsCredentialsProvider},
    aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider},
    aws_sigv4::{
        http_request::{SignableBody, SignableRequest, SigningSettings, sign},
        sign::v4::SigningParams,
    },
    aws_smithy_runtime_api::client::identity::Identity,
    serde::Deserialize,
    thiserror::Error,
    tracing::{debug, info, warn},
};

use caproxy_config::ProxyConfig;

use crate::token::AuthToken;

/// Requested token lifetime (12 h). The refresher runs at half of it, so a
/// single missed cycle still leaves a valid token installed.
pub const TOKEN_DURATION_SECS: u64 = 43_200;

/// Advertised by the container runtime when a task-assigned identity exists.
pub const ECS_CREDENTIALS_ENV: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";

const SIGNING_SERVICE: &str = "codeartifact";
const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(30);

// ── Errors ───────────────────────────────────────────────────────────────────

/// A failed token fetch. Never fatal past startup: the refresher logs it and
/// the previously installed token stays in effect.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no AWS identity available: {0}")]
    Identity(String),
    #[error("request signing failed: {0}")]
    Sign(String),
    #[error("token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned {status}")]
    Status { status: reqwest::StatusCode },
    #[error("malformed token response: {0}")]
    Malformed(String),
}

// ── Provider seam ────────────────────────────────────────────────────────────

/// Source of upstream authorization tokens.
///
/// The refresher only knows this seam; tests substitute their own
/// implementations.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<AuthToken, ProviderError>;
}

// ── CodeArtifact implementation ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    authorization_token: String,
    /// Epoch seconds; CodeArtifact reports when the token stops working.
    expiration: Option<f64>,
}

/// Fetches authorization tokens from the regional CodeArtifact token
/// endpoint with SigV4-signed requests.
pub struct CodeArtifactTokenProvider {
    credentials: SharedCredentialsProvider,
    http: reqwest::Client,
    region: String,
    domain: String,
    account_id: String,
    endpoint: String,
}

impl CodeArtifactTokenProvider {
    pub async fn new(config: &ProxyConfig) -> Result<Self, ProviderError> {
        let credentials = resolve_identity(&config.region).await?;
        let http = reqwest::Client::builder()
            .timeout(TOKEN_ENDPOINT_TIMEOUT)
            .build()?;
        Ok(Self {
            credentials,
            http,
            region: config.region.clone(),
            domain: config.domain.clone(),
            account_id: config.account_id.clone(),
            endpoint: format!("https://codeartifact.{}.amazonaws.com", config.region),
        })
    }

    fn token_url(&self) -> String {
        token_url(&self.endpoint, &self.domain, &self.account_id)
    }

    async fn signed_headers(&self, url: &str) -> Result<Vec<(String, String)>, ProviderError> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| ProviderError::Identity(e.to_string()))?;
        let expiry = credentials.expiry();
        let identity = Identity::new(credentials, expiry);

        let signing_params = SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ProviderError::Sign(e.to_string()))?;

        let signable_request = SignableRequest::new(
            "POST",
            url,
            std::iter::empty::<(&str, &str)>(),
            SignableBody::Bytes(&[]),
        )
        .map_err(|e| ProviderError::Sign(e.to_string()))?;

        let (signing_instructions, _) = sign(signable_request, &signing_params.into())
            .map_err(|e| ProviderError::Sign(e.to_string()))?
            .into_parts();

        Ok(signing_instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

#[async_trait]
impl TokenProvider for CodeArtifactTokenProvider {
    async fn fetch_token(&self) -> Result<AuthToken, ProviderError> {
        let url = self.token_url();
        let headers = self.signed_headers(&url).await?;

        let mut request = self.http.post(&url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status { status });
        }

        let body = response.text().await?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let valid_for = parsed
            .expiration
            .and_then(|expiration| {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs_f64();
                Duration::try_from_secs_f64((expiration - now).max(0.0)).ok()
            })
            .unwrap_or(Duration::from_secs(TOKEN_DURATION_SECS));

        debug!(valid_for_secs = valid_for.as_secs(), "token endpoint call succeeded");
        Ok(AuthToken::new(parsed.authorization_token, valid_for))
    }
}

fn token_url(endpoint: &str, domain: &str, account_id: &str) -> String {
    format!(
        "{endpoint}/v1/authorization/token?domain={domain}&domain-owner={account_id}&duration={TOKEN_DURATION_SECS}"
    )
}

// ── Identity resolution ──────────────────────────────────────────────────────

/// Resolve the AWS identity used to sign token-endpoint calls.
///
/// Container-assigned identity is tried first when the runtime advertises
/// one; any failure there falls back to the default provider chain, loudly,
/// so a broken task role is visible in the logs without being fatal.
async fn resolve_identity(region: &str) -> Result<SharedCredentialsProvider, ProviderError> {
    if std::env::var(ECS_CREDENTIALS_ENV).is_ok() {
        info!("resolving AWS identity from the container credentials endpoint");
        let ecs = EcsCredentialsProvider::builder().build();
        match ecs.provide_credentials().await {
            Ok(_) => return Ok(SharedCredentialsProvider::new(ecs)),
            Err(e) => {
                warn!(error = %e, "container credentials unavailable, falling back to default chain");
            },
        }
    }

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
        .credentials_provider()
        .ok_or_else(|| ProviderError::Identity("no credentials in the default chain".into()))
}
