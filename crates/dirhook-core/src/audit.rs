//! Append-only attribute change history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single recorded before/after value for one user attribute.
///
/// Records are append-only and owned by the external history store. An empty
/// `old_value` means the attribute had no prior value; an empty `new_value`
/// records a deletion. A record is only ever written when the two differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Correlates entries belonging to one logical update.
    pub changeset_id: Uuid,
    /// Subject username.
    pub username: String,
    /// Attribute name, e.g. `external_id` or `email`.
    pub attribute: String,
    /// Previous value; empty string means absent.
    pub old_value: String,
    /// New value; empty string records a deletion.
    pub new_value: String,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Create a record with a fresh changeset id.
    pub fn new(
        username: impl Into<String>,
        attribute: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            changeset_id: Uuid::new_v4(),
            username: username.into(),
            attribute: attribute.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            timestamp,
        }
    }

    /// True when this record introduced the attribute (no prior value).
    pub fn is_initial(&self) -> bool {
        self.old_value.is_empty()
    }

    /// True when this record removed the attribute.
    pub fn is_deletion(&self) -> bool {
        self.new_value.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_and_deletion() {
        let added = AuditRecord::new("alice", "external_id", "", "gh-42", Utc::now());
        assert!(added.is_initial());
        assert!(!added.is_deletion());

        let removed = AuditRecord::new("alice", "external_id", "gh-42", "", Utc::now());
        assert!(!removed.is_initial());
        assert!(removed.is_deletion());
    }

    #[test]
    fn test_changeset_ids_are_unique() {
        let a = AuditRecord::new("alice", "email", "", "a@x", Utc::now());
        let b = AuditRecord::new("alice", "email", "a@x", "b@x", Utc::now());
        assert_ne!(a.changeset_id, b.changeset_id);
    }
}
