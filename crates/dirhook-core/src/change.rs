//! Raw directory-change notifications.
//!
//! One kind-tagged input enum consumed by a single synthesis entry point,
//! replacing the host-pushed listener callbacks of event-bus directories.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a directory within the identity store.
pub type DirectoryId = i64;

/// How a membership edge relates its child to the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipType {
    /// A user is a direct member of the group.
    GroupUser,
    /// A group is a member of another group (nested membership).
    GroupGroup,
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipType::GroupUser => write!(f, "group_user"),
            MembershipType::GroupGroup => write!(f, "group_group"),
        }
    }
}

/// A raw mutation notification from the identity directory.
///
/// Each variant carries exactly what the underlying event source delivers;
/// the synthesizer reconstructs anything missing (before-values, closures)
/// from the directory and history collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryChange {
    /// A user record was created.
    UserCreated {
        directory_id: DirectoryId,
        username: String,
    },

    /// One or more users were deleted; the records are already gone.
    UsersDeleted {
        directory_id: DirectoryId,
        usernames: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Attributes were stored on a user. Only the attributes that changed
    /// are present; a value set may be empty per the event source.
    AttributesStored {
        directory_id: DirectoryId,
        username: String,
        attributes: HashMap<String, Vec<String>>,
        timestamp: DateTime<Utc>,
    },

    /// An attribute was removed from a user.
    AttributeDeleted {
        directory_id: DirectoryId,
        username: String,
        attribute: String,
        timestamp: DateTime<Utc>,
    },

    /// A user's email address changed; the new value lives on the record.
    EmailChanged {
        directory_id: DirectoryId,
        username: String,
        timestamp: DateTime<Utc>,
    },

    /// Users or nested groups were added to a group.
    MembershipsCreated {
        directory_id: DirectoryId,
        group_name: String,
        membership_type: MembershipType,
        entity_names: Vec<String>,
    },

    /// A user or nested group was removed from a group. The removal has
    /// already been committed in the directory when this arrives.
    MembershipDeleted {
        directory_id: DirectoryId,
        group_name: String,
        membership_type: MembershipType,
        entity_name: String,
    },
}

impl DirectoryChange {
    /// Short name for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DirectoryChange::UserCreated { .. } => "user_created",
            DirectoryChange::UsersDeleted { .. } => "users_deleted",
            DirectoryChange::AttributesStored { .. } => "attributes_stored",
            DirectoryChange::AttributeDeleted { .. } => "attribute_deleted",
            DirectoryChange::EmailChanged { .. } => "email_changed",
            DirectoryChange::MembershipsCreated { .. } => "memberships_created",
            DirectoryChange::MembershipDeleted { .. } => "membership_deleted",
        }
    }

    /// The directory the change happened in.
    pub fn directory_id(&self) -> DirectoryId {
        match self {
            DirectoryChange::UserCreated { directory_id, .. }
            | DirectoryChange::UsersDeleted { directory_id, .. }
            | DirectoryChange::AttributesStored { directory_id, .. }
            | DirectoryChange::AttributeDeleted { directory_id, .. }
            | DirectoryChange::EmailChanged { directory_id, .. }
            | DirectoryChange::MembershipsCreated { directory_id, .. }
            | DirectoryChange::MembershipDeleted { directory_id, .. } => *directory_id,
        }
    }
}
