//! Attribute change history with no-op suppression.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use dirhook_core::{AuditRecord, EngineResult, HistoryStore};

/// Gives every attribute mutation a "before" value, even though the raw
/// event usually carries only the "after" value.
///
/// Reads go through the store's most-recent-first ordering; the trail never
/// re-sorts. Writes are read-compare-append: re-delivered values (directory
/// re-synchronization) produce no record and no downstream event.
pub struct AttributeAuditTrail {
    history: Arc<dyn HistoryStore>,
}

impl AttributeAuditTrail {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    /// The most recently recorded new-value for the attribute, or `None` if
    /// no history exists.
    pub async fn last_value(
        &self,
        username: &str,
        attribute: &str,
    ) -> EngineResult<Option<String>> {
        let records = self.history.query(username, attribute).await?;
        Ok(records.into_iter().next().map(|r| r.new_value))
    }

    /// Record a change to `new_value`, returning the appended record.
    ///
    /// Returns `Ok(None)` without writing when the value is unchanged. An
    /// empty `new_value` records a deletion; an empty previous value means
    /// the attribute had none.
    pub async fn record_change(
        &self,
        username: &str,
        attribute: &str,
        new_value: &str,
        timestamp: DateTime<Utc>,
    ) -> EngineResult<Option<AuditRecord>> {
        let old_value = self
            .last_value(username, attribute)
            .await?
            .unwrap_or_default();

        if old_value == new_value {
            tracing::debug!(
                target: "dirhook_audit",
                username = %username,
                attribute = %attribute,
                "Value unchanged, suppressing audit write"
            );
            return Ok(None);
        }

        let record = AuditRecord::new(username, attribute, old_value, new_value, timestamp);
        self.history.append(record.clone()).await?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirhook_core::memory::InMemoryHistory;
    use dirhook_core::EngineError;

    fn trail() -> (Arc<InMemoryHistory>, AttributeAuditTrail) {
        let history = Arc::new(InMemoryHistory::new());
        let trail = AttributeAuditTrail::new(history.clone());
        (history, trail)
    }

    #[tokio::test]
    async fn test_last_value_empty_history() {
        let (_, trail) = trail();
        assert_eq!(trail.last_value("alice", "external_id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_diff_uses_most_recent_entry() {
        let (_, trail) = trail();
        trail
            .record_change("alice", "external_id", "x1", Utc::now())
            .await
            .unwrap();
        let record = trail
            .record_change("alice", "external_id", "x2", Utc::now())
            .await
            .unwrap()
            .expect("value changed, record expected");

        assert_eq!(record.old_value, "x1");
        assert_eq!(record.new_value, "x2");
        assert_eq!(
            trail.last_value("alice", "external_id").await.unwrap(),
            Some("x2".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_op_is_suppressed() {
        let (history, trail) = trail();
        trail
            .record_change("alice", "external_id", "x1", Utc::now())
            .await
            .unwrap();
        let second = trail
            .record_change("alice", "external_id", "x1", Utc::now())
            .await
            .unwrap();

        assert!(second.is_none());
        assert_eq!(history.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_absent_value_is_suppressed() {
        let (history, trail) = trail();
        let record = trail
            .record_change("alice", "external_id", "", Utc::now())
            .await
            .unwrap();
        assert!(record.is_none());
        assert!(history.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_attributes_are_tracked_independently() {
        let (_, trail) = trail();
        trail
            .record_change("alice", "external_id", "gh-1", Utc::now())
            .await
            .unwrap();
        trail
            .record_change("alice", "email", "a@x.io", Utc::now())
            .await
            .unwrap();

        assert_eq!(
            trail.last_value("alice", "email").await.unwrap(),
            Some("a@x.io".to_string())
        );
        assert_eq!(
            trail.last_value("alice", "external_id").await.unwrap(),
            Some("gh-1".to_string())
        );
        assert_eq!(trail.last_value("bob", "email").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let (history, trail) = trail();
        history.set_fail_writes(true);
        let err = trail
            .record_change("alice", "external_id", "gh-1", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::HistoryWriteFailed { .. }));
    }
}
