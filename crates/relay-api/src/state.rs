//! # Application State
//!
//! Shared state for the Axum application. Every call receives a clone, and
//! handlers are constructed from it through `Handler::from_scope`.

use crate::data::{Blog, InMemoryStore};

/// Default claim value issued by the canned identity provider.
pub const DEFAULT_CANNED_USERNAME: &str = "bob master 3000";

/// Application configuration.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bearer token the identity provider accepts. `None` accepts any token.
    pub auth_token: Option<String>,
    /// `username` claim attached to every authenticated caller.
    pub canned_username: String,
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, and `CANNED_USERNAME`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            auth_token: std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            canned_username: std::env::var("CANNED_USERNAME").unwrap_or(defaults.canned_username),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("canned_username", &self.canned_username)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            auth_token: None,
            canned_username: DEFAULT_CANNED_USERNAME.to_string(),
        }
    }
}

/// Shared application state passed to every route pipeline.
#[derive(Debug, Clone)]
pub struct AppState {
    pub blogs: InMemoryStore<Blog>,
    pub config: AppConfig,
}

impl AppState {
    /// State with default configuration and an empty store.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            blogs: InMemoryStore::new(),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("super-secret".to_string()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 5000);
        assert!(config.auth_token.is_none());
        assert_eq!(config.canned_username, DEFAULT_CANNED_USERNAME);
    }

    #[test]
    fn state_clones_share_the_store() {
        use crate::data::Repository;

        let state = AppState::new();
        let clone = state.clone();
        let mut uow = clone.blogs.unit_of_work();
        uow.add(Blog::default());
        uow.commit().unwrap();
        assert_eq!(state.blogs.len(), 1);
    }
}
