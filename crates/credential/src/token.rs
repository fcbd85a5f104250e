use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};

/// A CodeArtifact authorization token plus the metadata needed to reason
/// about its remaining lifetime.
///
/// Immutable once created: a refresh produces a new value, it never mutates
/// an installed one. `Debug` redacts the token itself.
#[derive(Debug, Clone)]
pub struct AuthToken {
    secret: SecretString,
    obtained_at: Instant,
    valid_for: Duration,
}

impl AuthToken {
    pub fn new(secret: impl Into<String>, valid_for: Duration) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            obtained_at: Instant::now(),
            valid_for,
        }
    }

    /// The raw token value, for embedding in upstream requests only.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn obtained_at(&self) -> Instant {
        self.obtained_at
    }

    pub fn valid_for(&self) -> Duration {
        self.valid_for
    }

    pub fn remaining(&self) -> Duration {
        self.valid_for.saturating_sub(self.obtained_at.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_expired() {
        let token = AuthToken::new("tok", Duration::from_secs(60));
        assert!(!token.is_expired());
        assert!(token.remaining() <= Duration::from_secs(60));
    }

    #[test]
    fn zero_lifetime_token_is_expired() {
        let token = AuthToken::new("tok", Duration::ZERO);
        assert!(token.is_expired());
    }

    #[test]
    fn debug_output_redacts_token() {
        let token = AuthToken::new("hunter2", Duration::from_secs(60));
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("hunter2"));
        assert_eq!(token.expose(), "hunter2");
    }
}
