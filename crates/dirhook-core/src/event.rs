//! Canonical output events.
//!
//! The engine's normalized output record, decoupled from the raw triggering
//! change. Field-wise equality is load-bearing: downstream deduplication and
//! the test suite both compare whole events.

use serde::{Deserialize, Serialize};

use crate::user::UserSnapshot;

/// The kind of change a canonical event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    UserAdded,
    ExternalIdAdded,
    UserAddedToGroup,
    EmailUpdated,
    ExternalIdUpdated,
    UserDeleted,
    ExternalIdDeleted,
    UserRemovedFromGroup,
}

impl EventKind {
    /// Stable string form, used in logs and delivery headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserAdded => "UserAdded",
            EventKind::ExternalIdAdded => "ExternalIdAdded",
            EventKind::UserAddedToGroup => "UserAddedToGroup",
            EventKind::EmailUpdated => "EmailUpdated",
            EventKind::ExternalIdUpdated => "ExternalIdUpdated",
            EventKind::UserDeleted => "UserDeleted",
            EventKind::ExternalIdDeleted => "ExternalIdDeleted",
            EventKind::UserRemovedFromGroup => "UserRemovedFromGroup",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized "what changed" record for downstream consumers.
///
/// Absent fields are omitted from the wire shape entirely, never emitted as
/// nulls that could be mistaken for an empty-string value. The user snapshot
/// is absent for deletion kinds where the user record no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEvent {
    /// What happened.
    pub kind: EventKind,
    /// Snapshot of the affected user, when still resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSnapshot>,
    /// Affected group, for membership kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// Previous external id, for external-id kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_external_id: Option<String>,
    /// New external id, for external-id kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_external_id: Option<String>,
    /// Previous email, for email and deletion kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_email: Option<String>,
    /// New email, for email kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_email: Option<String>,
}

impl CanonicalEvent {
    fn bare(kind: EventKind) -> Self {
        Self {
            kind,
            user: None,
            group_name: None,
            old_external_id: None,
            new_external_id: None,
            old_email: None,
            new_email: None,
        }
    }

    /// A user was created in the directory.
    pub fn user_added(user: Option<UserSnapshot>) -> Self {
        Self {
            user,
            ..Self::bare(EventKind::UserAdded)
        }
    }

    /// A user was deleted, carrying whatever old values history recovered.
    pub fn user_deleted(old_external_id: Option<String>, old_email: Option<String>) -> Self {
        Self {
            old_external_id,
            old_email,
            ..Self::bare(EventKind::UserDeleted)
        }
    }

    /// An external id was set for the first time.
    pub fn external_id_added(user: Option<UserSnapshot>, new_external_id: String) -> Self {
        Self {
            user,
            new_external_id: Some(new_external_id),
            ..Self::bare(EventKind::ExternalIdAdded)
        }
    }

    /// An external id was replaced.
    pub fn external_id_updated(
        user: Option<UserSnapshot>,
        old_external_id: String,
        new_external_id: String,
    ) -> Self {
        Self {
            user,
            old_external_id: Some(old_external_id),
            new_external_id: Some(new_external_id),
            ..Self::bare(EventKind::ExternalIdUpdated)
        }
    }

    /// An external id was removed.
    pub fn external_id_deleted(user: Option<UserSnapshot>, old_external_id: String) -> Self {
        Self {
            user,
            old_external_id: Some(old_external_id),
            ..Self::bare(EventKind::ExternalIdDeleted)
        }
    }

    /// A user's email address changed.
    pub fn email_updated(
        user: Option<UserSnapshot>,
        old_email: Option<String>,
        new_email: String,
    ) -> Self {
        Self {
            user,
            old_email,
            new_email: Some(new_email),
            ..Self::bare(EventKind::EmailUpdated)
        }
    }

    /// A user gained membership in a group (directly or via closure).
    pub fn user_added_to_group(user: Option<UserSnapshot>, group_name: String) -> Self {
        Self {
            user,
            group_name: Some(group_name),
            ..Self::bare(EventKind::UserAddedToGroup)
        }
    }

    /// A user lost membership in a group through every remaining path.
    pub fn user_removed_from_group(user: Option<UserSnapshot>, group_name: String) -> Self {
        Self {
            user,
            group_name: Some(group_name),
            ..Self::bare(EventKind::UserRemovedFromGroup)
        }
    }
}
