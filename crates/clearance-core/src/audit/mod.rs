//! Append-only audit trail: every state-changing clearance operation leaves
//! exactly one entry here. Writes are recovered locally and never surfaced to
//! the business caller; reads support filtered pagination, per-entity
//! history, and dashboard windows.

pub mod entry;
pub mod store;
pub mod trail;

pub use entry::{redact, AuditAction, AuditEntry, NewAuditEntry};
pub use store::{AuditQuery, AuditStore, AuditStoreError, InMemoryAuditStore};
pub use trail::AuditTrail;
