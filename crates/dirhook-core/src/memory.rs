//! In-memory reference implementations of the collaborator traits.
//!
//! Used by the test suites and local development. The directory keeps a
//! small membership DAG (user -> direct groups, child group -> parent
//! groups) and answers the nested-relationship queries by walking it. All
//! three adapters support failure injection so outage handling can be
//! exercised.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::audit::AuditRecord;
use crate::change::DirectoryId;
use crate::directory::{DirectoryService, GroupRecord, UserRecord};
use crate::error::{EngineError, EngineResult};
use crate::event::CanonicalEvent;
use crate::history::HistoryStore;
use crate::sink::NotificationSink;

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<String, UserRecord>,
    groups: BTreeSet<String>,
    /// user -> groups the user is a direct member of.
    user_memberships: HashMap<String, BTreeSet<String>>,
    /// child group -> groups it is a direct member of.
    group_parents: HashMap<String, BTreeSet<String>>,
}

impl DirectoryState {
    /// Upward closure from a set of starting groups, excluding the seeds.
    fn ancestors(&self, seeds: &BTreeSet<String>) -> BTreeSet<String> {
        let mut seen: BTreeSet<String> = seeds.clone();
        let mut frontier: Vec<String> = seeds.iter().cloned().collect();
        while let Some(group) = frontier.pop() {
            if let Some(parents) = self.group_parents.get(&group) {
                for parent in parents {
                    if seen.insert(parent.clone()) {
                        frontier.push(parent.clone());
                    }
                }
            }
        }
        seeds.iter().for_each(|g| {
            seen.remove(g);
        });
        seen
    }

    /// The group itself plus every group nested under it.
    fn descendants(&self, group_name: &str) -> BTreeSet<String> {
        let mut seen: BTreeSet<String> = BTreeSet::from([group_name.to_string()]);
        let mut frontier = vec![group_name.to_string()];
        while let Some(group) = frontier.pop() {
            for (child, parents) in &self.group_parents {
                if parents.contains(&group) && seen.insert(child.clone()) {
                    frontier.push(child.clone());
                }
            }
        }
        seen
    }
}

/// In-memory [`DirectoryService`].
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
    unavailable: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every query fail with `DirectoryUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> EngineResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(EngineError::directory_unavailable(
                "simulated directory outage",
            ))
        } else {
            Ok(())
        }
    }

    pub async fn add_user(&self, record: UserRecord) {
        let mut state = self.state.write().await;
        state.users.insert(record.username.clone(), record);
    }

    pub async fn remove_user(&self, username: &str) {
        let mut state = self.state.write().await;
        state.users.remove(username);
        state.user_memberships.remove(username);
    }

    pub async fn set_user_attribute(&self, username: &str, name: &str, value: &str) {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(username) {
            user.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub async fn remove_user_attribute(&self, username: &str, name: &str) {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(username) {
            user.attributes.remove(name);
        }
    }

    pub async fn set_user_email(&self, username: &str, email: &str) {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(username) {
            user.email = Some(email.to_string());
        }
    }

    pub async fn add_group(&self, name: &str) {
        let mut state = self.state.write().await;
        state.groups.insert(name.to_string());
    }

    pub async fn add_user_to_group(&self, username: &str, group_name: &str) {
        let mut state = self.state.write().await;
        state
            .user_memberships
            .entry(username.to_string())
            .or_default()
            .insert(group_name.to_string());
    }

    pub async fn remove_user_from_group(&self, username: &str, group_name: &str) {
        let mut state = self.state.write().await;
        if let Some(groups) = state.user_memberships.get_mut(username) {
            groups.remove(group_name);
        }
    }

    /// Make `child` a member of `parent` (nested group edge).
    pub async fn add_group_to_group(&self, child: &str, parent: &str) {
        let mut state = self.state.write().await;
        state
            .group_parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
    }

    pub async fn remove_group_from_group(&self, child: &str, parent: &str) {
        let mut state = self.state.write().await;
        if let Some(parents) = state.group_parents.get_mut(child) {
            parents.remove(parent);
        }
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn find_user(
        &self,
        _directory_id: DirectoryId,
        username: &str,
    ) -> EngineResult<UserRecord> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| EngineError::user_not_found(username))
    }

    async fn find_group(
        &self,
        _directory_id: DirectoryId,
        group_name: &str,
    ) -> EngineResult<GroupRecord> {
        self.check_available()?;
        let state = self.state.read().await;
        if state.groups.contains(group_name) {
            Ok(GroupRecord::new(group_name))
        } else {
            Err(EngineError::group_not_found(group_name))
        }
    }

    async fn groups_of_user(
        &self,
        _directory_id: DirectoryId,
        username: &str,
    ) -> EngineResult<BTreeSet<String>> {
        self.check_available()?;
        let state = self.state.read().await;
        let direct = state
            .user_memberships
            .get(username)
            .cloned()
            .unwrap_or_default();
        let mut all = state.ancestors(&direct);
        all.extend(direct);
        Ok(all)
    }

    async fn ancestors_of_group(
        &self,
        _directory_id: DirectoryId,
        group_name: &str,
    ) -> EngineResult<BTreeSet<String>> {
        self.check_available()?;
        let state = self.state.read().await;
        let seed = BTreeSet::from([group_name.to_string()]);
        Ok(state.ancestors(&seed))
    }

    async fn users_of_group(
        &self,
        _directory_id: DirectoryId,
        group_name: &str,
    ) -> EngineResult<BTreeSet<String>> {
        self.check_available()?;
        let state = self.state.read().await;
        let reachable = state.descendants(group_name);
        let mut users = BTreeSet::new();
        for (username, groups) in &state.user_memberships {
            if !groups.is_disjoint(&reachable) {
                users.insert(username.clone());
            }
        }
        Ok(users)
    }
}

/// In-memory append-only [`HistoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: RwLock<Vec<AuditRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append fail with `HistoryWriteFailed`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every record written so far, oldest first.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, record: AuditRecord) -> EngineResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::history_write_failed(
                "simulated history outage",
            ));
        }
        self.records.write().await.push(record);
        Ok(())
    }

    async fn query(&self, username: &str, attribute: &str) -> EngineResult<Vec<AuditRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.username == username && r.attribute == attribute)
            .rev()
            .cloned()
            .collect())
    }
}

/// [`NotificationSink`] that records every published event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RwLock<Vec<CanonicalEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event published so far, in publish order.
    pub async fn events(&self) -> Vec<CanonicalEvent> {
        self.events.read().await.clone()
    }

    /// Drain recorded events.
    pub async fn take(&self) -> Vec<CanonicalEvent> {
        std::mem::take(&mut *self.events.write().await)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, event: &CanonicalEvent) -> EngineResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
