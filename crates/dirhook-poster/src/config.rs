//! Poster configuration.

use std::env;

/// Default delivery target when no URL is configured.
pub const DEFAULT_TARGET_URL: &str = "http://localhost:5000";

/// Webhook delivery configuration.
#[derive(Debug, Clone)]
pub struct PosterConfig {
    /// Where canonical events are POSTed.
    pub target_url: String,
    /// Shared secret for payload signing. Unsigned delivery when absent.
    pub secret: Option<String>,
}

impl PosterConfig {
    /// Load configuration from environment variables.
    ///
    /// - `DIRHOOK_WEBHOOK_URL`: delivery target (default
    ///   `http://localhost:5000`)
    /// - `DIRHOOK_WEBHOOK_SECRET`: signing secret (optional)
    pub fn from_env() -> Self {
        let target_url = env::var("DIRHOOK_WEBHOOK_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());
        let secret = env::var("DIRHOOK_WEBHOOK_SECRET")
            .ok()
            .filter(|v| !v.is_empty());

        if secret.is_none() {
            tracing::warn!(
                target: "dirhook_poster",
                "No webhook secret is set, webhooks will be unsigned"
            );
        }

        Self { target_url, secret }
    }

    /// Create a configuration for the given target URL.
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            secret: None,
        }
    }

    /// Set the signing secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}
