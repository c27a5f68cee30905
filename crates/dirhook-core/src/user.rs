//! Point-in-time user snapshots.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Immutable point-in-time view of a directory user.
///
/// Constructed fresh for each raw change notification and discarded once the
/// synthesis call completes. `groups` holds every group the user belongs to
/// directly or transitively at snapshot time; membership-removal suppression
/// is evaluated against this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    /// Unique username within the directory.
    pub username: String,
    /// Email address, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Linked third-party account id, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// All groups the user belongs to, directly or through nested groups.
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl UserSnapshot {
    /// Create a snapshot with no group memberships.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            display_name: None,
            external_id: None,
            groups: BTreeSet::new(),
        }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the external id.
    #[must_use]
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Set the transitive group memberships.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Check whether the user is (still) a member of `group`.
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}
