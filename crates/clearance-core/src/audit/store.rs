use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::entry::{AuditAction, AuditEntry, NewAuditEntry};
use crate::clearance::domain::UserId;

/// Error enumeration for audit-store failures. The trail recovers all of
/// these; they never reach business callers.
#[derive(Debug, thiserror::Error)]
pub enum AuditStoreError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Filter set for the paginated read path. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor_user_id: Option<UserId>,
    pub entity_type: Option<String>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub page: usize,
    pub page_size: usize,
}

/// Append-only persistence seam for the audit trail. No update or delete is
/// ever part of this contract.
pub trait AuditStore: Send + Sync {
    /// Assigns the monotonic id and UTC timestamp, then appends.
    fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AuditStoreError>;
    /// Filtered page, most recent first, plus the unpaginated match count.
    fn query(&self, query: &AuditQuery) -> Result<(Vec<AuditEntry>, usize), AuditStoreError>;
    /// Full history for one entity, most recent first.
    fn for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, AuditStoreError>;
    /// The N most recent entries for dashboards.
    fn recent(&self, count: usize) -> Result<Vec<AuditEntry>, AuditStoreError>;
}

/// Vec-backed adapter used by tests and the demo service.
#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
    sequence: AtomicU64,
}

impl InMemoryAuditStore {
    fn matches(entry: &AuditEntry, query: &AuditQuery) -> bool {
        if let Some(actor) = &query.actor_user_id {
            if entry.actor_user_id.as_ref() != Some(actor) {
                return false;
            }
        }
        if let Some(entity_type) = &query.entity_type {
            if &entry.entity_type != entity_type {
                return false;
            }
        }
        if let Some(action) = query.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(from) = query.from {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(until) = query.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AuditStoreError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = AuditEntry {
            id,
            actor_user_id: entry.actor_user_id,
            actor_email: entry.actor_email,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            old_values: entry.old_values,
            new_values: entry.new_values,
            details: entry.details,
            origin: entry.origin,
            timestamp: Utc::now(),
        };
        let mut guard = self.entries.lock().expect("audit store mutex poisoned");
        guard.push(stored.clone());
        Ok(stored)
    }

    fn query(&self, query: &AuditQuery) -> Result<(Vec<AuditEntry>, usize), AuditStoreError> {
        let guard = self.entries.lock().expect("audit store mutex poisoned");
        let mut matches: Vec<_> = guard
            .iter()
            .filter(|entry| Self::matches(entry, query))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matches.len();
        let page = matches
            .into_iter()
            .skip(query.page.saturating_sub(1) * query.page_size)
            .take(query.page_size)
            .collect();
        Ok((page, total))
    }

    fn for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let guard = self.entries.lock().expect("audit store mutex poisoned");
        let mut matches: Vec<_> = guard
            .iter()
            .filter(|entry| entry.entity_type == entity_type && entry.entity_id == entity_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(matches)
    }

    fn recent(&self, count: usize) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let guard = self.entries.lock().expect("audit store mutex poisoned");
        let mut entries: Vec<_> = guard.iter().cloned().collect();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.truncate(count);
        Ok(entries)
    }
}
