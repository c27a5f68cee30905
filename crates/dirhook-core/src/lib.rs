//! # dirhook-core
//!
//! Shared data model and collaborator boundaries for the dirhook event
//! engine.
//!
//! The engine observes identity-directory mutation events and converts each
//! into canonical, de-duplicated notification records. This crate holds the
//! value objects flowing through that pipeline and the traits behind which
//! the external collaborators live:
//!
//! - [`DirectoryService`]: user/group lookup and nested-membership closures
//! - [`HistoryStore`]: durable append-only attribute change history
//! - [`NotificationSink`]: outbound delivery of canonical events
//!
//! The [`memory`] module provides in-memory reference adapters with failure
//! injection, shared by the test suites.

pub mod audit;
pub mod change;
pub mod directory;
pub mod error;
pub mod event;
pub mod history;
pub mod memory;
pub mod sink;
pub mod user;

pub use audit::AuditRecord;
pub use change::{DirectoryChange, DirectoryId, MembershipType};
pub use directory::{DirectoryService, GroupRecord, UserRecord};
pub use error::{EngineError, EngineResult};
pub use event::{CanonicalEvent, EventKind};
pub use history::HistoryStore;
pub use sink::NotificationSink;
pub use user::UserSnapshot;

/// Attribute under which a user's linked third-party account id is stored.
pub const EXTERNAL_ID_ATTRIBUTE: &str = "external_id";

/// Attribute under which email changes are recorded in history.
pub const EMAIL_ATTRIBUTE: &str = "email";
