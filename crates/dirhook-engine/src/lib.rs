//! # dirhook-engine
//!
//! Event normalization and membership-closure engine.
//!
//! Consumes one raw [`DirectoryChange`](dirhook_core::DirectoryChange) at a
//! time and produces zero or more canonical, de-duplicated events describing
//! what changed:
//!
//! - [`GroupClosureResolver`] resolves nested group relationships into the
//!   full set of affected groups and users.
//! - [`AttributeAuditTrail`] reconstructs before/after values the raw event
//!   does not carry, with no-op suppression for re-delivered values.
//! - [`EventSynthesizer`] orchestrates both and fans out over the
//!   (user, group) product for membership changes, suppressing pairs still
//!   reachable through another path.
//!
//! The engine keeps no durable state and no cross-invocation state; all
//! storage lives behind the `dirhook-core` collaborator traits.

pub mod audit_trail;
pub mod closure;
pub mod synthesizer;

pub use audit_trail::AttributeAuditTrail;
pub use closure::GroupClosureResolver;
pub use synthesizer::EventSynthesizer;
