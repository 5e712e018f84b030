//! Bearer token supply for the connection handshake.
//!
//! The token is read from a [`TokenStore`] each time [`crate::realtime::Client::connect`]
//! opens a new transport. It is not refreshed on automatic reconnection.

use std::sync::{Arc, PoisonError, RwLock};

/// Secret string types that redact values in debug output for security.
pub use secrecy::{ExposeSecret, SecretString};

/// Source of the bearer token attached to the handshake.
pub trait TokenStore: Send + Sync + 'static {
    /// Current token, if the user is signed in.
    fn token(&self) -> Option<SecretString>;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn token(&self) -> Option<SecretString> {
        (**self).token()
    }
}

/// In-memory token slot, written by whatever owns the sign-in flow.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token<S: Into<String>>(token: S) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::from(token.into()))),
        }
    }

    /// Replace the stored token.
    pub fn set<S: Into<String>>(&self, token: S) {
        // Option<SecretString> has no inconsistent intermediate state, so a poisoned lock is fine.
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SecretString::from(token.into()));
    }

    /// Forget the stored token.
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// `Authorization` header value for `token`.
pub(crate) fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryTokenStore::new();
        assert!(store.token().is_none());
    }

    #[test]
    fn memory_store_set_and_clear() {
        let store = MemoryTokenStore::new();

        store.set("abc");
        assert_eq!(store.token().unwrap().expose_secret(), "abc");

        store.set("def");
        assert_eq!(store.token().unwrap().expose_secret(), "def");

        store.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn shared_store_reads_latest_value() {
        let store = Arc::new(MemoryTokenStore::with_token("first"));
        let shared: Arc<dyn TokenStore> = Arc::clone(&store) as Arc<dyn TokenStore>;

        store.set("second");

        assert_eq!(shared.token().unwrap().expose_secret(), "second");
    }

    #[test]
    fn bearer_formats_header() {
        let token = SecretString::from("t0k3n".to_owned());
        assert_eq!(bearer(&token), "Bearer t0k3n");
    }

    #[test]
    fn debug_output_redacts_token() {
        let store = MemoryTokenStore::with_token("super-secret");
        let debug = format!("{store:?}");
        assert!(!debug.contains("super-secret"));
    }
}
