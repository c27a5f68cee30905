//! History store boundary.

use async_trait::async_trait;

use crate::audit::AuditRecord;
use crate::error::EngineResult;

/// Durable, append-only storage for attribute change history.
///
/// The store owns all durable state; the engine only appends and reads.
/// If the host delivers concurrent notifications for the same
/// (username, attribute) pair, the store must serialize them per key, or
/// two concurrent read-compare-append sequences can compute the same stale
/// old value.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a record. Never updates or deletes existing entries.
    async fn append(&self, record: AuditRecord) -> EngineResult<()>;

    /// All records for the given (username, attribute) pair, most recent
    /// first.
    async fn query(&self, username: &str, attribute: &str) -> EngineResult<Vec<AuditRecord>>;
}
