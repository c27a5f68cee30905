//! Canonical event synthesis.
//!
//! One state-transition per raw directory-change kind: look up what the raw
//! event does not carry, fan out over membership closures, suppress no-ops
//! and events made moot by overlapping group paths, and hand the finished
//! events to the notification sink.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use dirhook_core::{
    CanonicalEvent, DirectoryChange, DirectoryId, DirectoryService, EngineResult, HistoryStore,
    MembershipType, NotificationSink, UserSnapshot, EMAIL_ATTRIBUTE, EXTERNAL_ID_ATTRIBUTE,
};

use crate::audit_trail::AttributeAuditTrail;
use crate::closure::GroupClosureResolver;

/// Converts raw directory-change notifications into canonical events.
///
/// Holds no cross-invocation state; concurrent invocations for different
/// notifications are safe. Directory failures are absorbed at the narrowest
/// possible scope (per affected user or group) so one unreachable entity
/// never aborts the rest of a fan-out. History write failures do abort the
/// triggering sub-operation: an event whose audit record was not durably
/// written is not emitted.
///
/// Membership-removal suppression re-queries the user's group list after
/// the removal has been committed; the backing directory must reflect the
/// removal by then, or overlapping-path suppression can under- or
/// over-fire.
pub struct EventSynthesizer {
    directory: Arc<dyn DirectoryService>,
    resolver: GroupClosureResolver,
    audit: AttributeAuditTrail,
    sink: Arc<dyn NotificationSink>,
}

impl EventSynthesizer {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        history: Arc<dyn HistoryStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            resolver: GroupClosureResolver::new(directory.clone()),
            audit: AttributeAuditTrail::new(history),
            directory,
            sink,
        }
    }

    /// Handle one raw notification, publishing and returning the canonical
    /// events it produced.
    pub async fn handle(&self, change: DirectoryChange) -> EngineResult<Vec<CanonicalEvent>> {
        tracing::debug!(
            target: "dirhook_synthesizer",
            kind = change.kind_name(),
            directory_id = change.directory_id(),
            "Handling directory change"
        );

        let events = match change {
            DirectoryChange::UserCreated {
                directory_id,
                username,
            } => self.user_created(directory_id, &username).await,
            DirectoryChange::UsersDeleted {
                usernames,
                timestamp,
                ..
            } => self.users_deleted(&usernames, timestamp).await,
            DirectoryChange::AttributesStored {
                directory_id,
                username,
                attributes,
                timestamp,
            } => {
                let values = attributes.get(EXTERNAL_ID_ATTRIBUTE);
                match values {
                    Some(values) => {
                        self.external_id_stored(directory_id, &username, values, timestamp)
                            .await?
                    }
                    None => Vec::new(),
                }
            }
            DirectoryChange::AttributeDeleted {
                directory_id,
                username,
                attribute,
                timestamp,
            } => {
                if attribute == EXTERNAL_ID_ATTRIBUTE {
                    self.external_id_deleted(directory_id, &username, timestamp)
                        .await?
                } else {
                    Vec::new()
                }
            }
            DirectoryChange::EmailChanged {
                directory_id,
                username,
                timestamp,
            } => self.email_changed(directory_id, &username, timestamp).await?,
            DirectoryChange::MembershipsCreated {
                directory_id,
                group_name,
                membership_type,
                entity_names,
            } => {
                self.memberships_created(directory_id, &group_name, membership_type, &entity_names)
                    .await
            }
            DirectoryChange::MembershipDeleted {
                directory_id,
                group_name,
                membership_type,
                entity_name,
            } => {
                self.membership_deleted(directory_id, &group_name, membership_type, &entity_name)
                    .await
            }
        };

        self.publish_all(&events).await;
        Ok(events)
    }

    async fn user_created(
        &self,
        directory_id: DirectoryId,
        username: &str,
    ) -> Vec<CanonicalEvent> {
        let user = self.snapshot(directory_id, username).await;
        vec![CanonicalEvent::user_added(user)]
    }

    /// The user records are already gone; recover old external id and email
    /// from history by recording a deletion tombstone per attribute. Any
    /// history failure is non-fatal and simply leaves the field unset.
    async fn users_deleted(
        &self,
        usernames: &[String],
        timestamp: DateTime<Utc>,
    ) -> Vec<CanonicalEvent> {
        let mut events = Vec::with_capacity(usernames.len());
        for username in usernames {
            let old_external_id = self
                .recover_on_delete(username, EXTERNAL_ID_ATTRIBUTE, timestamp)
                .await;
            let old_email = self
                .recover_on_delete(username, EMAIL_ATTRIBUTE, timestamp)
                .await;
            events.push(CanonicalEvent::user_deleted(old_external_id, old_email));
        }
        events
    }

    async fn recover_on_delete(
        &self,
        username: &str,
        attribute: &str,
        timestamp: DateTime<Utc>,
    ) -> Option<String> {
        match self
            .audit
            .record_change(username, attribute, "", timestamp)
            .await
        {
            Ok(record) => record.map(|r| r.old_value),
            Err(err) => {
                tracing::warn!(
                    target: "dirhook_synthesizer",
                    username = %username,
                    attribute = %attribute,
                    error = %err,
                    "Could not recover attribute history for deleted user"
                );
                None
            }
        }
    }

    /// External id stored. The event source may deliver an empty value set;
    /// an empty string is substituted so the audit round-trip still happens.
    async fn external_id_stored(
        &self,
        directory_id: DirectoryId,
        username: &str,
        values: &[String],
        timestamp: DateTime<Utc>,
    ) -> EngineResult<Vec<CanonicalEvent>> {
        let user = self.snapshot(directory_id, username).await;
        // Single-valued attribute; only the first value is considered.
        let new_value = values.first().cloned().unwrap_or_else(|| {
            tracing::warn!(
                target: "dirhook_synthesizer",
                username = %username,
                "Attribute-stored event carried no external id value"
            );
            String::new()
        });

        let Some(record) = self
            .audit
            .record_change(username, EXTERNAL_ID_ATTRIBUTE, &new_value, timestamp)
            .await?
        else {
            // Re-delivered value, nothing changed.
            return Ok(Vec::new());
        };

        let event = if record.is_initial() {
            CanonicalEvent::external_id_added(user, record.new_value)
        } else {
            CanonicalEvent::external_id_updated(user, record.old_value, record.new_value)
        };
        Ok(vec![event])
    }

    async fn external_id_deleted(
        &self,
        directory_id: DirectoryId,
        username: &str,
        timestamp: DateTime<Utc>,
    ) -> EngineResult<Vec<CanonicalEvent>> {
        let user = self.snapshot(directory_id, username).await;
        let Some(record) = self
            .audit
            .record_change(username, EXTERNAL_ID_ATTRIBUTE, "", timestamp)
            .await?
        else {
            // Already absent.
            return Ok(Vec::new());
        };
        Ok(vec![CanonicalEvent::external_id_deleted(
            user,
            record.old_value,
        )])
    }

    async fn email_changed(
        &self,
        directory_id: DirectoryId,
        username: &str,
        timestamp: DateTime<Utc>,
    ) -> EngineResult<Vec<CanonicalEvent>> {
        let user = self.snapshot(directory_id, username).await;
        let new_email = user
            .as_ref()
            .and_then(|u| u.email.clone())
            .unwrap_or_default();

        let Some(record) = self
            .audit
            .record_change(username, EMAIL_ATTRIBUTE, &new_email, timestamp)
            .await?
        else {
            return Ok(Vec::new());
        };

        let old_email = (!record.old_value.is_empty()).then_some(record.old_value);
        Ok(vec![CanonicalEvent::email_updated(
            user,
            old_email,
            record.new_value,
        )])
    }

    /// One `UserAddedToGroup` per (affected user, group-and-ancestors)
    /// pair. A nested-group addition fans out over every user reachable
    /// under each added group.
    async fn memberships_created(
        &self,
        directory_id: DirectoryId,
        group_name: &str,
        membership_type: MembershipType,
        entity_names: &[String],
    ) -> Vec<CanonicalEvent> {
        let groups = self.resolver.ancestors_of(directory_id, group_name).await;
        if groups.is_empty() {
            return Vec::new();
        }

        let users = self
            .affected_users(directory_id, membership_type, entity_names)
            .await;

        let mut events = Vec::new();
        for username in &users {
            let Some(user) = self.snapshot(directory_id, username).await else {
                continue;
            };
            for group in &groups {
                events.push(CanonicalEvent::user_added_to_group(
                    Some(user.clone()),
                    group.clone(),
                ));
            }
        }
        events
    }

    /// One `UserRemovedFromGroup` per (user, group) pair the user can no
    /// longer reach. Pairs still reachable through another membership path
    /// are suppressed; the snapshot is taken after the removal has been
    /// committed in the directory.
    async fn membership_deleted(
        &self,
        directory_id: DirectoryId,
        group_name: &str,
        membership_type: MembershipType,
        entity_name: &str,
    ) -> Vec<CanonicalEvent> {
        let groups = self.resolver.ancestors_of(directory_id, group_name).await;
        if groups.is_empty() {
            return Vec::new();
        }

        let entities = [entity_name.to_string()];
        let users = self
            .affected_users(directory_id, membership_type, &entities)
            .await;

        let mut events = Vec::new();
        for username in &users {
            let Some(user) = self.snapshot(directory_id, username).await else {
                continue;
            };
            for group in &groups {
                if user.is_member_of(group) {
                    tracing::debug!(
                        target: "dirhook_synthesizer",
                        username = %username,
                        group = %group,
                        "Still reachable through another path, suppressing removal"
                    );
                    continue;
                }
                events.push(CanonicalEvent::user_removed_from_group(
                    Some(user.clone()),
                    group.clone(),
                ));
            }
        }
        events
    }

    /// The users touched by a membership change: the named users directly,
    /// or every user reachable under each named nested group.
    async fn affected_users(
        &self,
        directory_id: DirectoryId,
        membership_type: MembershipType,
        entity_names: &[String],
    ) -> BTreeSet<String> {
        match membership_type {
            MembershipType::GroupUser => entity_names.iter().cloned().collect(),
            MembershipType::GroupGroup => {
                let mut users = BTreeSet::new();
                for group in entity_names {
                    users.extend(self.resolver.users_under(directory_id, group).await);
                }
                users
            }
        }
    }

    /// Fresh point-in-time snapshot of a user, transitive groups included.
    /// Returns `None` (logged) when the user or the directory cannot be
    /// resolved; callers skip that user and continue the fan-out.
    async fn snapshot(
        &self,
        directory_id: DirectoryId,
        username: &str,
    ) -> Option<UserSnapshot> {
        let record = match self.directory.find_user(directory_id, username).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    target: "dirhook_synthesizer",
                    username = %username,
                    error = %err,
                    "Could not look up user"
                );
                return None;
            }
        };

        let groups = match self.directory.groups_of_user(directory_id, username).await {
            Ok(groups) => groups,
            Err(err) => {
                tracing::warn!(
                    target: "dirhook_synthesizer",
                    username = %username,
                    error = %err,
                    "Could not resolve group memberships"
                );
                return None;
            }
        };

        let mut snapshot = UserSnapshot::new(record.username.clone()).with_groups(groups);
        snapshot.email = record.email.clone();
        snapshot.display_name = record.display_name.clone();
        snapshot.external_id = record.external_id().map(str::to_string);
        Some(snapshot)
    }

    async fn publish_all(&self, events: &[CanonicalEvent]) {
        for event in events {
            if let Err(err) = self.sink.publish(event).await {
                tracing::warn!(
                    target: "dirhook_synthesizer",
                    kind = %event.kind,
                    error = %err,
                    "Failed to publish canonical event"
                );
            }
        }
        if !events.is_empty() {
            tracing::info!(
                target: "dirhook_synthesizer",
                count = events.len(),
                "Published canonical events"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use dirhook_core::memory::{InMemoryDirectory, InMemoryHistory, RecordingSink};
    use dirhook_core::{EngineError, EventKind, UserRecord};

    const DIR: DirectoryId = 7;

    struct Fixture {
        directory: Arc<InMemoryDirectory>,
        history: Arc<InMemoryHistory>,
        sink: Arc<RecordingSink>,
        synthesizer: EventSynthesizer,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new());
        let history = Arc::new(InMemoryHistory::new());
        let sink = Arc::new(RecordingSink::new());
        let synthesizer = EventSynthesizer::new(
            directory.clone(),
            history.clone(),
            sink.clone(),
        );
        Fixture {
            directory,
            history,
            sink,
            synthesizer,
        }
    }

    fn stored(username: &str, value: &str) -> DirectoryChange {
        DirectoryChange::AttributesStored {
            directory_id: DIR,
            username: username.to_string(),
            attributes: HashMap::from([(
                EXTERNAL_ID_ATTRIBUTE.to_string(),
                vec![value.to_string()],
            )]),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_user_created_emits_snapshot() {
        let f = fixture();
        f.directory
            .add_user(UserRecord::new("alice").with_email("alice@example.com"))
            .await;

        let events = f
            .synthesizer
            .handle(DirectoryChange::UserCreated {
                directory_id: DIR,
                username: "alice".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::UserAdded);
        let user = events[0].user.as_ref().unwrap();
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert!(user.external_id.is_none());
        assert_eq!(f.sink.events().await, events);
    }

    #[tokio::test]
    async fn test_user_created_survives_missing_user() {
        let f = fixture();
        let events = f
            .synthesizer
            .handle(DirectoryChange::UserCreated {
                directory_id: DIR,
                username: "ghost".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert!(events[0].user.is_none());
    }

    #[tokio::test]
    async fn test_non_external_id_attribute_is_ignored() {
        let f = fixture();
        f.directory.add_user(UserRecord::new("alice")).await;

        let events = f
            .synthesizer
            .handle(DirectoryChange::AttributesStored {
                directory_id: DIR,
                username: "alice".to_string(),
                attributes: HashMap::from([(
                    "shoe_size".to_string(),
                    vec!["42".to_string()],
                )]),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert!(events.is_empty());
        assert!(f.history.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_value_substitutes_empty_string() {
        let f = fixture();
        f.directory.add_user(UserRecord::new("alice")).await;
        f.synthesizer.handle(stored("alice", "gh-1")).await.unwrap();

        // Value set empty per the event source: still audited, emitted as
        // an update to the empty value.
        let events = f
            .synthesizer
            .handle(DirectoryChange::AttributesStored {
                directory_id: DIR,
                username: "alice".to_string(),
                attributes: HashMap::from([(EXTERNAL_ID_ATTRIBUTE.to_string(), vec![])]),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ExternalIdUpdated);
        assert_eq!(events[0].old_external_id.as_deref(), Some("gh-1"));
        assert_eq!(events[0].new_external_id.as_deref(), Some(""));
        assert_eq!(f.history.records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_history_write_failure_suppresses_event() {
        let f = fixture();
        f.directory.add_user(UserRecord::new("alice")).await;
        f.history.set_fail_writes(true);

        let err = f
            .synthesizer
            .handle(stored("alice", "gh-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::HistoryWriteFailed { .. }));
        assert!(f.sink.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_attribute_delete_without_prior_value_is_silent() {
        let f = fixture();
        f.directory.add_user(UserRecord::new("alice")).await;

        let events = f
            .synthesizer
            .handle(DirectoryChange::AttributeDeleted {
                directory_id: DIR,
                username: "alice".to_string(),
                attribute: EXTERNAL_ID_ATTRIBUTE.to_string(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_email_change_records_diff() {
        let f = fixture();
        f.directory
            .add_user(UserRecord::new("alice").with_email("old@example.com"))
            .await;
        f.synthesizer
            .handle(DirectoryChange::EmailChanged {
                directory_id: DIR,
                username: "alice".to_string(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        f.directory.set_user_email("alice", "new@example.com").await;
        let events = f
            .synthesizer
            .handle(DirectoryChange::EmailChanged {
                directory_id: DIR,
                username: "alice".to_string(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::EmailUpdated);
        assert_eq!(events[0].old_email.as_deref(), Some("old@example.com"));
        assert_eq!(events[0].new_email.as_deref(), Some("new@example.com"));
    }

    #[tokio::test]
    async fn test_email_redelivery_is_suppressed() {
        let f = fixture();
        f.directory
            .add_user(UserRecord::new("alice").with_email("a@example.com"))
            .await;

        let change = DirectoryChange::EmailChanged {
            directory_id: DIR,
            username: "alice".to_string(),
            timestamp: Utc::now(),
        };
        let first = f.synthesizer.handle(change.clone()).await.unwrap();
        let second = f.synthesizer.handle(change).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(f.history.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_membership_added_during_outage_is_absorbed() {
        let f = fixture();
        f.directory.add_group("staff").await;
        f.directory.add_user(UserRecord::new("alice")).await;
        f.directory.set_unavailable(true);

        let events = f
            .synthesizer
            .handle(DirectoryChange::MembershipsCreated {
                directory_id: DIR,
                group_name: "staff".to_string(),
                membership_type: MembershipType::GroupUser,
                entity_names: vec!["alice".to_string()],
            })
            .await
            .unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_user_is_skipped_in_fanout() {
        let f = fixture();
        f.directory.add_group("staff").await;
        f.directory.add_user(UserRecord::new("bob")).await;
        f.directory.add_user_to_group("bob", "staff").await;

        let events = f
            .synthesizer
            .handle(DirectoryChange::MembershipsCreated {
                directory_id: DIR,
                group_name: "staff".to_string(),
                membership_type: MembershipType::GroupUser,
                entity_names: vec!["ghost".to_string(), "bob".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].user.as_ref().unwrap().username,
            "bob".to_string()
        );
    }
}
