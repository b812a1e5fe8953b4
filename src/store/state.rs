//! Typed access to the client store
//!
//! The session token is the only state shared between the watchdog and the
//! API client. It is read from the store on every call and never cached.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::{KeyValueStore, StoreChange, StoreError};
use crate::models::{Language, LoginResponse, StoredUser};

/// Login record: profile fields plus token
pub const USER_KEY: &str = "user";
/// Redundant copy of the bearer token
pub const TOKEN_KEY: &str = "token";
pub const DARK_MODE_KEY: &str = "darkMode";
pub const LANGUAGE_KEY: &str = "language";

/// Typed read/write contract over a [`KeyValueStore`]
#[derive(Clone)]
pub struct ClientState {
    store: Arc<dyn KeyValueStore>,
}

impl ClientState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The persisted login record, if any.
    ///
    /// A record that no longer parses is treated as absent.
    pub fn user(&self) -> Option<StoredUser> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable user record");
                None
            }
        }
    }

    /// Current bearer token: the login record's token, else the redundant entry
    pub fn token(&self) -> Option<String> {
        self.user()
            .and_then(|user| user.token)
            .filter(|token| !token.trim().is_empty())
            .or_else(|| self.read(TOKEN_KEY).filter(|token| !token.trim().is_empty()))
    }

    /// Whether anything session-related is persisted
    pub fn has_session(&self) -> bool {
        self.read(USER_KEY).is_some() || self.read(TOKEN_KEY).is_some()
    }

    /// Persist a fresh login
    pub fn save_login(&self, login: &LoginResponse) -> Result<(), StoreError> {
        let record = StoredUser {
            profile: login.user.clone(),
            token: Some(login.token.clone()),
        };
        self.store.set(USER_KEY, &serde_json::to_string(&record)?)?;
        self.store.set(TOKEN_KEY, &login.token)
    }

    /// Swap in a renewed token, keeping the profile
    pub fn replace_token(&self, token: &str) -> Result<(), StoreError> {
        if let Some(mut record) = self.user() {
            record.token = Some(token.to_string());
            self.store.set(USER_KEY, &serde_json::to_string(&record)?)?;
        }
        self.store.set(TOKEN_KEY, token)
    }

    /// Drop the login record and token; preferences survive
    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.store.remove(USER_KEY)?;
        self.store.remove(TOKEN_KEY)
    }

    pub fn dark_mode(&self) -> bool {
        self.read(DARK_MODE_KEY)
            .map(|v| v.trim() == "true")
            .unwrap_or(false)
    }

    pub fn set_dark_mode(&self, enabled: bool) -> Result<(), StoreError> {
        self.store
            .set(DARK_MODE_KEY, if enabled { "true" } else { "false" })
    }

    pub fn language(&self) -> Language {
        self.read(LANGUAGE_KEY)
            .and_then(|code| code.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_language(&self, language: Language) -> Result<(), StoreError> {
        self.store.set(LANGUAGE_KEY, language.code())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Client store read failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientState")
            .field("has_session", &self.has_session())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserRole};
    use crate::store::{ChangeKind, MemoryStore};

    fn state() -> ClientState {
        ClientState::new(Arc::new(MemoryStore::new()))
    }

    fn login(token: &str) -> LoginResponse {
        LoginResponse {
            user: User {
                id: 1,
                username: "admin".to_string(),
                full_name: Some("Admin Gudang".to_string()),
                email: None,
                role: UserRole::Admin,
                created_at: None,
            },
            token: token.to_string(),
        }
    }

    #[test]
    fn test_save_login_persists_user_and_token() {
        let state = state();
        assert!(!state.has_session());

        state.save_login(&login("tok-1")).unwrap();

        assert!(state.has_session());
        assert_eq!(state.token().as_deref(), Some("tok-1"));
        assert_eq!(state.user().unwrap().profile.username, "admin");
    }

    #[test]
    fn test_replace_token_updates_both_entries() {
        let state = state();
        state.save_login(&login("tok-1")).unwrap();

        state.replace_token("tok-2").unwrap();

        assert_eq!(state.user().unwrap().token.as_deref(), Some("tok-2"));
        assert_eq!(state.token().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_token_falls_back_to_redundant_entry() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(USER_KEY, r#"{"id":1,"username":"admin","role":"admin"}"#)
            .unwrap();
        store.set(TOKEN_KEY, "tok-legacy").unwrap();

        let state = ClientState::new(store);
        assert_eq!(state.token().as_deref(), Some("tok-legacy"));
    }

    #[test]
    fn test_unreadable_user_record_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_KEY, "{broken").unwrap();

        let state = ClientState::new(store);
        assert!(state.user().is_none());
        assert!(state.token().is_none());
        assert!(state.has_session());
    }

    #[test]
    fn test_clear_session_keeps_preferences() {
        let state = state();
        state.save_login(&login("tok-1")).unwrap();
        state.set_dark_mode(true).unwrap();
        state.set_language(Language::En).unwrap();

        let mut rx = state.subscribe();
        state.clear_session().unwrap();

        assert!(!state.has_session());
        assert!(state.token().is_none());
        assert!(state.dark_mode());
        assert_eq!(state.language(), Language::En);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.key, USER_KEY);
        assert_eq!(first.kind, ChangeKind::Removed);
    }

    #[test]
    fn test_preference_defaults() {
        let state = state();
        assert!(!state.dark_mode());
        assert_eq!(state.language(), Language::Id);
    }
}
