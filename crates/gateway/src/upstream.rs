use caproxy_config::ProxyConfig;
use caproxy_credential::AuthToken;

/// Upstream repository coordinates, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub region: String,
    pub account_id: String,
    pub domain: String,
    pub repository: String,
    /// Replaces the derived `https://…codeartifact…` scheme + host, so tests
    /// can aim at a local stub. The path shape and embedded credential are
    /// unchanged.
    pub endpoint_override: Option<String>,
}

impl UpstreamConfig {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            region: config.region.clone(),
            account_id: config.account_id.clone(),
            domain: config.domain.clone(),
            repository: config.repository.clone(),
            endpoint_override: None,
        }
    }

    /// Scheme + userinfo + host for upstream requests.
    fn authority(&self, token: &AuthToken) -> String {
        match &self.endpoint_override {
            Some(endpoint) => match endpoint.split_once("://") {
                Some((scheme, host)) => format!("{scheme}://aws:{}@{host}", token.expose()),
                None => format!("https://aws:{}@{endpoint}", token.expose()),
            },
            None => format!(
                "https://aws:{}@{}-{}.d.codeartifact.{}.amazonaws.com",
                token.expose(),
                self.domain,
                self.account_id,
                self.region
            ),
        }
    }
}

/// Build the fully qualified upstream URL for one request.
///
/// Strips at most one leading `/` from `path` and performs no other
/// normalization; the remainder is passed through untouched for the
/// upstream to interpret. The result embeds the passed token, so it must be
/// computed fresh per request and never cached across requests.
pub fn build_upstream_url(path: &str, token: &AuthToken, upstream: &UpstreamConfig) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    format!(
        "{}/pypi/{}/simple/{}",
        upstream.authority(token),
        upstream.repository,
        path
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn upstream() -> UpstreamConfig {
        UpstreamConfig {
            region: "us-east-1".into(),
            account_id: "1234".into(),
            domain: "d".into(),
            repository: "r".into(),
            endpoint_override: None,
        }
    }

    fn token(value: &str) -> AuthToken {
        AuthToken::new(value, Duration::from_secs(60))
    }

    #[test]
    fn builds_the_exact_codeartifact_url() {
        let url = build_upstream_url("simple/requests/", &token("T"), &upstream());
        assert_eq!(
            url,
            "https://aws:T@d-1234.d.codeartifact.us-east-1.amazonaws.com/pypi/r/simple/simple/requests/"
        );
    }

    #[test]
    fn leading_separator_is_stripped_exactly_once() {
        let cfg = upstream();
        let tok = token("T");
        assert_eq!(
            build_upstream_url("foo/bar", &tok, &cfg),
            build_upstream_url("/foo/bar", &tok, &cfg)
        );
        // Only one leading slash is stripped; the rest passes through raw.
        assert!(build_upstream_url("//foo", &tok, &cfg).ends_with("/simple//foo"));
    }

    #[test]
    fn internal_segments_are_not_normalized() {
        let url = build_upstream_url("a/../b%2f", &token("T"), &upstream());
        assert!(url.ends_with("/simple/a/../b%2f"));
    }

    #[test]
    fn embeds_exactly_the_passed_token() {
        let cfg = upstream();
        let first = build_upstream_url("p", &token("first"), &cfg);
        let second = build_upstream_url("p", &token("second"), &cfg);
        assert!(first.contains("aws:first@"));
        assert!(second.contains("aws:second@"));
        assert!(!second.contains("first"));
    }

    #[test]
    fn empty_path_targets_the_index_root() {
        let url = build_upstream_url("", &token("T"), &upstream());
        assert!(url.ends_with("/pypi/r/simple/"));
    }

    #[test]
    fn endpoint_override_swaps_scheme_and_host_only() {
        let mut cfg = upstream();
        cfg.endpoint_override = Some("http://127.0.0.1:9999".into());
        let url = build_upstream_url("/foo/", &token("T"), &cfg);
        assert_eq!(url, "http://aws:T@127.0.0.1:9999/pypi/r/simple/foo/");
    }
}
