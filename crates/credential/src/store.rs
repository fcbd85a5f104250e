use std::sync::Arc;

use tokio::sync::RwLock;

use crate::token::AuthToken;

/// Single shared slot holding the current upstream token.
///
/// The refresher is the only writer; request handlers are the readers.
/// `read` hands out a cloned snapshot, so a handler never holds the lock
/// across its own upstream I/O and a concurrent `replace` is never blocked
/// by an in-flight request. Replacement swaps the whole value: readers
/// observe either the previous token or the new one, never a mixture.
#[derive(Clone, Default)]
pub struct TokenStore {
    slot: Arc<RwLock<Option<AuthToken>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current token. `None` only before the first successful
    /// refresh.
    pub async fn read(&self) -> Option<AuthToken> {
        self.slot.read().await.clone()
    }

    /// Install a new token as the current value.
    pub async fn replace(&self, token: AuthToken) {
        *self.slot.write().await = Some(token);
    }
}
