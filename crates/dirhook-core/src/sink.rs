//! Notification sink boundary.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::event::CanonicalEvent;

/// Receives finished canonical events for delivery.
///
/// Fire-and-forget from the engine's perspective: delivery guarantees,
/// retries and ordering are the sink's responsibility.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one canonical event.
    async fn publish(&self, event: &CanonicalEvent) -> EngineResult<()>;
}
