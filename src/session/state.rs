//! Session state: the bearer credential and its transitions.
//!
//! ```text
//! Anonymous ──establish(token)──▶ Authenticated
//! Authenticated ──establish(token')──▶ Authenticated (replaced wholesale)
//! Authenticated ──sign_out()──▶ Anonymous
//! Authenticated ──expire() on 401──▶ Anonymous
//! ```
//!
//! The in-memory copy is swapped atomically, so concurrent requests read either
//! the old or the new credential, never a partial one. A 401 only expires the
//! credential the rejected request carried; if a newer one has been
//! established meanwhile, it stays.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;

use crate::observability::metrics;
use crate::session::store::{MemoryTokenStore, TokenStore};

pub struct Session {
    current: ArcSwapOption<String>,
    store: Arc<dyn TokenStore>,
    /// Serializes transitions so the store and `current` change together.
    transitions: Mutex<()>,
}

impl Session {
    /// Open a session over `store`, picking up any persisted credential.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let initial = match store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored credential, starting signed out");
                None
            }
        };

        Self {
            current: ArcSwapOption::from(initial.map(Arc::new)),
            store,
            transitions: Mutex::new(()),
        }
    }

    /// A session that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn token(&self) -> Option<Arc<String>> {
        self.current.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.load().is_some()
    }

    /// Value for the `Authorization` header; empty when signed out.
    pub fn authorization_value(&self) -> String {
        match self.current.load().as_deref() {
            Some(token) => format!("Bearer {}", token),
            None => String::new(),
        }
    }

    /// Record a credential issued by a successful login or registration.
    pub fn establish(&self, token: String) {
        let _guard = self.lock_transitions();
        if let Err(e) = self.store.save(&token) {
            tracing::warn!(error = %e, "Could not persist credential");
        }
        self.current.store(Some(Arc::new(token)));
        tracing::info!("Session established");
    }

    /// Explicit sign-out.
    pub fn sign_out(&self) {
        let _guard = self.lock_transitions();
        self.drop_credential();
        tracing::info!("Signed out");
    }

    /// The server rejected the credential.
    pub fn expire(&self) {
        let _guard = self.lock_transitions();
        self.drop_credential();
        metrics::record_session_expired();
        tracing::warn!("Session expired, credential discarded");
    }

    /// Expire `rejected` only if it is still the current credential.
    ///
    /// Returns `false` when another credential has replaced it since the
    /// rejected request was sent; that credential is left alone.
    pub fn expire_if_current(&self, rejected: &Arc<String>) -> bool {
        let _guard = self.lock_transitions();
        let expected = Some(Arc::clone(rejected));
        let previous = self.current.compare_and_swap(&expected, None);
        let matched = (*previous)
            .as_ref()
            .map_or(false, |token| Arc::ptr_eq(token, rejected));

        if !matched {
            tracing::debug!("Rejected credential already replaced, keeping the current one");
            return false;
        }

        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not remove stored credential");
        }
        metrics::record_session_expired();
        tracing::warn!("Session expired, credential discarded");
        true
    }

    fn lock_transitions(&self) -> std::sync::MutexGuard<'_, ()> {
        self.transitions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn drop_credential(&self) {
        self.current.store(None);
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not remove stored credential");
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_from_stored_token() {
        let store = Arc::new(MemoryTokenStore::with_token("persisted"));
        let session = Session::new(store);
        assert!(session.is_authenticated());
        assert_eq!(session.authorization_value(), "Bearer persisted");
    }

    #[test]
    fn test_transitions_update_store() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::new(store.clone());
        assert_eq!(session.authorization_value(), "");

        session.establish("tok-1".into());
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-1"));
        assert_eq!(session.token().as_deref().map(String::as_str), Some("tok-1"));

        session.establish("tok-2".into());
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-2"));

        session.expire();
        assert!(!session.is_authenticated());
        assert!(store.load().unwrap().is_none());

        session.establish("tok-3".into());
        session.sign_out();
        assert!(store.load().unwrap().is_none());
        assert_eq!(session.authorization_value(), "");
    }

    #[test]
    fn test_expire_if_current_matches_sent_credential() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::new(store.clone());

        session.establish("old".into());
        let sent = session.token().unwrap();
        assert!(session.expire_if_current(&sent));
        assert!(!session.is_authenticated());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_expire_if_current_keeps_newer_credential() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::new(store.clone());

        session.establish("old".into());
        let sent = session.token().unwrap();
        session.establish("new".into());

        assert!(!session.expire_if_current(&sent));
        assert_eq!(session.authorization_value(), "Bearer new");
        assert_eq!(store.load().unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_expire_if_current_same_text_new_login() {
        // A fresh login that happens to return the same token string is still
        // a different credential.
        let session = Session::in_memory();
        session.establish("same".into());
        let sent = session.token().unwrap();
        session.establish("same".into());

        assert!(!session.expire_if_current(&sent));
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_debug_hides_token() {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("secret")));
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("secret"));
    }
}
