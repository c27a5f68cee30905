//! Directory query service boundary.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::change::DirectoryId;
use crate::error::EngineResult;
use crate::EXTERNAL_ID_ATTRIBUTE;

/// A user as returned by the directory, attributes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Free-form single-valued attributes attached to the user.
    pub attributes: HashMap<String, String>,
}

impl UserRecord {
    /// Create a record with no attributes.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            display_name: None,
            attributes: HashMap::new(),
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

    /// Attach an attribute value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The linked external identity, if any.
    pub fn external_id(&self) -> Option<&str> {
        self.attribute(EXTERNAL_ID_ATTRIBUTE)
    }
}

/// A group as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub name: String,
}

impl GroupRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Read-only access to the external identity directory.
///
/// All nested-relationship queries return transitive closures; pagination
/// and result caps are the implementation's concern. Every call may fail
/// with `UserNotFound`/`GroupNotFound` or `DirectoryUnavailable`; the engine
/// absorbs those at the narrowest scope it can.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Find a user with its attributes.
    async fn find_user(&self, directory_id: DirectoryId, username: &str)
        -> EngineResult<UserRecord>;

    /// Find a group by name.
    async fn find_group(&self, directory_id: DirectoryId, group_name: &str)
        -> EngineResult<GroupRecord>;

    /// All groups the user belongs to, directly or through nested groups.
    async fn groups_of_user(
        &self,
        directory_id: DirectoryId,
        username: &str,
    ) -> EngineResult<BTreeSet<String>>;

    /// All groups the given group is transitively a member of (the group
    /// itself excluded).
    async fn ancestors_of_group(
        &self,
        directory_id: DirectoryId,
        group_name: &str,
    ) -> EngineResult<BTreeSet<String>>;

    /// All usernames reachable from the group through nested child groups.
    async fn users_of_group(
        &self,
        directory_id: DirectoryId,
        group_name: &str,
    ) -> EngineResult<BTreeSet<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_attributes() {
        let record = UserRecord::new("alice")
            .with_email("alice@example.com")
            .with_attribute(EXTERNAL_ID_ATTRIBUTE, "gh-42");

        assert_eq!(record.external_id(), Some("gh-42"));
        assert_eq!(record.attribute("missing"), None);
    }
}
