use std::{sync::Arc, time::Duration};

use {
    tokio::{
        task::JoinHandle,
        time::{self, MissedTickBehavior},
    },
    tracing::{debug, info, warn},
};

use crate::{
    provider::{ProviderError, TokenProvider},
    store::TokenStore,
    token::AuthToken,
};

/// Default refresh period: half the requested token lifetime (see
/// [`crate::provider::TOKEN_DURATION_SECS`]), so one missed cycle still
/// leaves a valid token installed.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(21_600);

/// Keeps the [`TokenStore`] populated from a [`TokenProvider`] on a fixed
/// period, independent of request traffic.
pub struct Refresher {
    provider: Arc<dyn TokenProvider>,
    store: TokenStore,
    period: Duration,
}

impl Refresher {
    pub fn new(provider: Arc<dyn TokenProvider>, store: TokenStore) -> Self {
        Self {
            provider,
            store,
            period: DEFAULT_REFRESH_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// One provider call. Success installs the new token; failure leaves the
    /// previously installed token (if any) untouched and reports the error.
    pub async fn refresh_once(&self) -> Result<AuthToken, ProviderError> {
        let token = self.provider.fetch_token().await?;
        self.store.replace(token.clone()).await;
        info!(
            valid_for_secs = token.valid_for().as_secs(),
            "installed fresh upstream token"
        );
        debug!(token = token.expose(), "new token value");
        Ok(token)
    }

    /// Run the recurring refresh loop.
    ///
    /// Callers perform the startup refresh themselves before serving, so the
    /// immediate first tick of the interval is consumed here. A failed tick
    /// is logged and the loop keeps going; the next tick still fires.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = self.refresh_once().await {
                    warn!(error = %e, "scheduled token refresh failed, keeping previous token");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Counts calls; fails while `failing` is set.
    struct ScriptedProvider {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl ScriptedProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            })
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenProvider for ScriptedProvider {
        async fn fetch_token(&self) -> Result<AuthToken, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(ProviderError::Identity("scripted failure".into()));
            }
            Ok(AuthToken::new(format!("tok-{n}"), Duration::from_secs(60)))
        }
    }

    #[tokio::test]
    async fn successful_refresh_installs_the_token() {
        let provider = ScriptedProvider::new();
        let store = TokenStore::new();
        let refresher = Refresher::new(provider.clone(), store.clone());

        refresher.refresh_once().await.unwrap();
        assert_eq!(store.read().await.unwrap().expose(), "tok-1");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_previous_token_installed() {
        let provider = ScriptedProvider::new();
        let store = TokenStore::new();
        let refresher = Refresher::new(provider.clone(), store.clone());

        refresher.refresh_once().await.unwrap();
        provider.set_failing(true);
        let err = refresher.refresh_once().await.unwrap_err();
        assert!(matches!(err, ProviderError::Identity(_)));
        // The prior token survives the failure.
        assert_eq!(store.read().await.unwrap().expose(), "tok-1");
    }

    #[tokio::test]
    async fn failed_refresh_on_empty_store_leaves_it_empty() {
        let provider = ScriptedProvider::new();
        provider.set_failing(true);
        let store = TokenStore::new();
        let refresher = Refresher::new(provider.clone(), store.clone());

        refresher.refresh_once().await.unwrap_err();
        assert!(store.read().await.is_none());
    }

    #[tokio::test]
    async fn store_holds_the_latest_success_across_interleaved_failures() {
        let provider = ScriptedProvider::new();
        let store = TokenStore::new();
        let refresher = Refresher::new(provider.clone(), store.clone());

        refresher.refresh_once().await.unwrap(); // tok-1
        provider.set_failing(true);
        refresher.refresh_once().await.unwrap_err();
        refresher.refresh_once().await.unwrap_err();
        provider.set_failing(false);
        refresher.refresh_once().await.unwrap(); // tok-4

        assert_eq!(store.read().await.unwrap().expose(), "tok-4");
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_refreshes_on_the_period_and_survives_failures() {
        let provider = ScriptedProvider::new();
        let store = TokenStore::new();
        let refresher = Refresher::new(provider.clone(), store.clone())
            .with_period(Duration::from_secs(10));

        // Startup refresh happens before the loop, as in production.
        refresher.refresh_once().await.unwrap();
        let handle = refresher.spawn();

        time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.read().await.unwrap().expose(), "tok-2");

        // A failing tick does not stop the loop or clear the store.
        provider.set_failing(true);
        time::sleep(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.read().await.unwrap().expose(), "tok-2");

        provider.set_failing(false);
        time::sleep(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.read().await.unwrap().expose(), "tok-4");

        handle.abort();
    }
}
