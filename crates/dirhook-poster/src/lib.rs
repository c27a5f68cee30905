//! # dirhook-poster
//!
//! Outbound webhook delivery for canonical dirhook events.
//!
//! [`WebhookPoster`] implements the `NotificationSink` boundary: each event
//! is serialized to JSON and POSTed to the configured target, signed with
//! HMAC-SHA256 over `{timestamp}.{body}` when a secret is configured.
//! Delivery is at-most-once from this crate's perspective; retries belong
//! to the host.

pub mod config;
pub mod poster;
pub mod signature;

pub use config::PosterConfig;
pub use poster::WebhookPoster;
