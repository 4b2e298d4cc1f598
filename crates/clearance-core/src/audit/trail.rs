use std::sync::Arc;

use tracing::{error, warn};

use super::entry::{redact, AuditEntry, NewAuditEntry};
use super::store::{AuditQuery, AuditStore, AuditStoreError};

const MAX_PAGE_SIZE: usize = 100;
const MAX_RECENT: usize = 200;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_RECENT: usize = 50;

/// Append-only trail over an [`AuditStore`].
///
/// The write path never reports failure to the business caller: payloads are
/// redacted, a transient store failure is retried once, and a permanent one
/// is dropped with an operational alert. Breaking a clearance operation over
/// a logging problem is the one thing this component must never do.
pub struct AuditTrail<A> {
    store: Arc<A>,
}

impl<A> AuditTrail<A>
where
    A: AuditStore,
{
    pub fn new(store: Arc<A>) -> Self {
        Self { store }
    }

    /// Record one entry. Infallible from the caller's perspective.
    pub fn record(&self, mut entry: NewAuditEntry) {
        entry.old_values = entry.old_values.take().map(redact);
        entry.new_values = entry.new_values.take().map(redact);

        match self.store.append(entry.clone()) {
            Ok(_) => {}
            Err(AuditStoreError::Unavailable(first_cause)) => {
                warn!(%first_cause, action = entry.action.label(), "audit append failed, retrying once");
                if let Err(second) = self.store.append(entry.clone()) {
                    error!(
                        cause = %second,
                        action = entry.action.label(),
                        entity_id = %entry.entity_id,
                        "audit entry dropped after retry"
                    );
                }
            }
        }
    }

    /// Filtered page, most recent first. Page and page size are clamped the
    /// same way the read endpoints have always clamped them.
    pub fn query(&self, mut query: AuditQuery) -> Result<(Vec<AuditEntry>, usize), AuditStoreError> {
        if query.page < 1 {
            query.page = 1;
        }
        if query.page_size < 1 {
            query.page_size = DEFAULT_PAGE_SIZE;
        }
        query.page_size = query.page_size.min(MAX_PAGE_SIZE);
        self.store.query(&query)
    }

    /// Full history for one entity, most recent first.
    pub fn for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, AuditStoreError> {
        self.store.for_entity(entity_type, entity_id)
    }

    /// The N most recent entries, clamped to a dashboard-sized window.
    pub fn recent(&self, count: usize) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let count = if count < 1 { DEFAULT_RECENT } else { count };
        self.store.recent(count.min(MAX_RECENT))
    }
}
