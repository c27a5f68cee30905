//! HTTP delivery of canonical events.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use dirhook_core::{CanonicalEvent, EngineError, EngineResult, NotificationSink};

use crate::config::PosterConfig;
use crate::signature::compute_signature;

/// Header carrying the hex-encoded HMAC-SHA256 payload signature.
pub const SIGNATURE_HEADER: &str = "X-Dirhook-Signature";

/// Header carrying the unix timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "X-Dirhook-Timestamp";

/// Header carrying the event kind, for cheap routing at the receiver.
pub const EVENT_KIND_HEADER: &str = "X-Dirhook-Event";

/// POSTs canonical events as JSON to a configured webhook target.
///
/// Implements [`NotificationSink`]; delivery failures are reported as
/// `PublishFailed` and left to the caller's retry policy.
pub struct WebhookPoster {
    config: PosterConfig,
    http_client: Client,
}

impl WebhookPoster {
    /// Create a poster with a shared HTTP client.
    pub fn new(config: PosterConfig) -> EngineResult<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("dirhook-poster/0.1")
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                EngineError::publish_failed_with_source("failed to build HTTP client", e)
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// The configured delivery target.
    pub fn target_url(&self) -> &str {
        &self.config.target_url
    }
}

#[async_trait]
impl NotificationSink for WebhookPoster {
    async fn publish(&self, event: &CanonicalEvent) -> EngineResult<()> {
        let payload = serde_json::to_vec(event).map_err(|e| EngineError::Serialization {
            message: e.to_string(),
        })?;
        let timestamp = Utc::now().timestamp().to_string();

        let mut request = self
            .http_client
            .post(&self.config.target_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(EVENT_KIND_HEADER, event.kind.as_str())
            .header(TIMESTAMP_HEADER, &timestamp);

        if let Some(secret) = &self.config.secret {
            let signature = compute_signature(secret, &timestamp, &payload);
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.body(payload).send().await.map_err(|e| {
            tracing::warn!(
                target: "dirhook_poster",
                url = %self.config.target_url,
                kind = %event.kind,
                error = %e,
                "Webhook event failed to post"
            );
            EngineError::publish_failed_with_source("webhook request failed", e)
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                target: "dirhook_poster",
                url = %self.config.target_url,
                kind = %event.kind,
                status = status.as_u16(),
                "Webhook event delivered"
            );
            Ok(())
        } else {
            tracing::warn!(
                target: "dirhook_poster",
                url = %self.config.target_url,
                kind = %event.kind,
                status = status.as_u16(),
                "Webhook target rejected event"
            );
            Err(EngineError::publish_failed(format!(
                "webhook target returned status {status}"
            )))
        }
    }
}
