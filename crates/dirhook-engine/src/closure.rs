//! Group membership closure resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use dirhook_core::{DirectoryId, DirectoryService, EngineError};

/// Translates a single named group into the two transitive closures that
/// membership-change handling fans out over.
///
/// A nested-group change can affect an unbounded number of users and
/// ancestor groups at once, so the synthesizer iterates the Cartesian
/// product of (affected users) x (group and its ancestors). Directory
/// failures here are absorbed: an empty closure means "no known effect",
/// never an error, so a transient outage suppresses one fan-out instead of
/// crashing synthesis.
pub struct GroupClosureResolver {
    directory: Arc<dyn DirectoryService>,
}

impl GroupClosureResolver {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }

    /// The group itself plus all groups reachable by following "member of"
    /// edges upward.
    ///
    /// Self-inclusion is required so direct membership changes are reported
    /// against the group actually touched, not only its parents. Returns an
    /// empty set when the group is unknown or the directory cannot be
    /// queried.
    pub async fn ancestors_of(
        &self,
        directory_id: DirectoryId,
        group_name: &str,
    ) -> BTreeSet<String> {
        let mut groups = BTreeSet::new();

        match self.directory.find_group(directory_id, group_name).await {
            Ok(group) => {
                groups.insert(group.name);
            }
            Err(err) => {
                log_closure_failure("ancestors_of", group_name, &err);
                return groups;
            }
        }

        match self
            .directory
            .ancestors_of_group(directory_id, group_name)
            .await
        {
            Ok(ancestors) => groups.extend(ancestors),
            Err(err) => log_closure_failure("ancestors_of", group_name, &err),
        }

        groups
    }

    /// All usernames reachable from the group through nested child groups.
    ///
    /// Returns an empty set on lookup failure, same policy as
    /// [`ancestors_of`](Self::ancestors_of).
    pub async fn users_under(
        &self,
        directory_id: DirectoryId,
        group_name: &str,
    ) -> BTreeSet<String> {
        match self.directory.users_of_group(directory_id, group_name).await {
            Ok(users) => users,
            Err(err) => {
                log_closure_failure("users_under", group_name, &err);
                BTreeSet::new()
            }
        }
    }
}

fn log_closure_failure(operation: &str, group_name: &str, err: &EngineError) {
    if err.is_transient() {
        tracing::warn!(
            target: "dirhook_closure",
            operation,
            group = %group_name,
            error = %err,
            "Directory unavailable, treating closure as empty"
        );
    } else {
        tracing::error!(
            target: "dirhook_closure",
            operation,
            group = %group_name,
            error = %err,
            "Closure lookup failed"
        );
    }
}
