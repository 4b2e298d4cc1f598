use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::domain::{ClearanceRequest, RequestId, RequestStatus, ResidentId};

/// Error enumeration for request-store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reference number already assigned")]
    Conflict,
    #[error("request not found")]
    NotFound,
    #[error("stale write: stored version {stored}, update carried {carried}")]
    VersionConflict { stored: u64, carried: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam over request records.
///
/// `update` is optimistic: the record must carry the version it was read at,
/// and the store rejects the write with [`StoreError::VersionConflict`] when
/// another writer got there first. Last-writer-wins is not an option for
/// state transitions.
pub trait RequestStore: Send + Sync {
    /// Persist a new request, assigning its id. Fails on a duplicate
    /// reference number.
    fn insert(&self, request: ClearanceRequest) -> Result<ClearanceRequest, StoreError>;
    fn fetch(&self, id: RequestId) -> Result<Option<ClearanceRequest>, StoreError>;
    fn fetch_by_reference(&self, reference: &str) -> Result<Option<ClearanceRequest>, StoreError>;
    /// Version-checked write; returns the stored record with its bumped stamp.
    fn update(&self, request: ClearanceRequest) -> Result<ClearanceRequest, StoreError>;
    /// A resident's own requests, latest first.
    fn for_resident(&self, resident: ResidentId) -> Result<Vec<ClearanceRequest>, StoreError>;
    /// Requests in one status, latest first.
    fn with_status(&self, status: RequestStatus) -> Result<Vec<ClearanceRequest>, StoreError>;
    /// The review queue (Submitted or Pending), oldest first for processing.
    fn awaiting_review(&self) -> Result<Vec<ClearanceRequest>, StoreError>;
    /// Released requests whose expiry instant has passed.
    fn expired_as_of(&self, now: DateTime<Utc>) -> Result<Vec<ClearanceRequest>, StoreError>;
}

/// Mutex-guarded map adapter; the authoritative store in tests and the demo
/// service. A SQL adapter satisfies the same trait behind a connection pool.
#[derive(Default)]
pub struct InMemoryRequestStore {
    records: Mutex<BTreeMap<i64, ClearanceRequest>>,
    sequence: AtomicI64,
}

impl RequestStore for InMemoryRequestStore {
    fn insert(&self, mut request: ClearanceRequest) -> Result<ClearanceRequest, StoreError> {
        let mut guard = self.records.lock().expect("request store mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.reference_number == request.reference_number)
        {
            return Err(StoreError::Conflict);
        }
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        request.id = RequestId(id);
        request.version = 1;
        guard.insert(id, request.clone());
        Ok(request)
    }

    fn fetch(&self, id: RequestId) -> Result<Option<ClearanceRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn fetch_by_reference(&self, reference: &str) -> Result<Option<ClearanceRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(guard
            .values()
            .find(|request| request.reference_number == reference)
            .cloned())
    }

    fn update(&self, mut request: ClearanceRequest) -> Result<ClearanceRequest, StoreError> {
        let mut guard = self.records.lock().expect("request store mutex poisoned");
        let stored = guard.get(&request.id.0).ok_or(StoreError::NotFound)?;
        if stored.version != request.version {
            return Err(StoreError::VersionConflict {
                stored: stored.version,
                carried: request.version,
            });
        }
        request.version += 1;
        guard.insert(request.id.0, request.clone());
        Ok(request)
    }

    fn for_resident(&self, resident: ResidentId) -> Result<Vec<ClearanceRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        let mut matches: Vec<_> = guard
            .values()
            .filter(|request| request.resident_id == resident)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(matches)
    }

    fn with_status(&self, status: RequestStatus) -> Result<Vec<ClearanceRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        let mut matches: Vec<_> = guard
            .values()
            .filter(|request| request.status == status)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(matches)
    }

    fn awaiting_review(&self) -> Result<Vec<ClearanceRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        let mut matches: Vec<_> = guard
            .values()
            .filter(|request| request.status.is_awaiting_review())
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.request_date.cmp(&b.request_date));
        Ok(matches)
    }

    fn expired_as_of(&self, now: DateTime<Utc>) -> Result<Vec<ClearanceRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(guard
            .values()
            .filter(|request| {
                request.status == RequestStatus::Released
                    && request.expiry_date.is_some_and(|expiry| expiry < now)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clearance::domain::ClearanceTypeId;
    use chrono::Duration;

    fn sample(reference: &str, offset_minutes: i64) -> ClearanceRequest {
        ClearanceRequest::submitted(
            reference.to_string(),
            ResidentId(1),
            ClearanceTypeId(1),
            "employment".to_string(),
            Utc::now() + Duration::minutes(offset_minutes),
        )
    }

    #[test]
    fn insert_assigns_sequential_ids_and_version_one() {
        let store = InMemoryRequestStore::default();
        let first = store.insert(sample("CLR-20260101-AAAAAAA1", 0)).unwrap();
        let second = store.insert(sample("CLR-20260101-AAAAAAA2", 1)).unwrap();
        assert_eq!(first.id, RequestId(1));
        assert_eq!(second.id, RequestId(2));
        assert_eq!(first.version, 1);
    }

    #[test]
    fn insert_rejects_duplicate_reference() {
        let store = InMemoryRequestStore::default();
        store.insert(sample("CLR-20260101-AAAAAAA1", 0)).unwrap();
        assert!(matches!(
            store.insert(sample("CLR-20260101-AAAAAAA1", 1)),
            Err(StoreError::Conflict)
        ));
    }

    #[test]
    fn update_rejects_stale_versions() {
        let store = InMemoryRequestStore::default();
        let stored = store.insert(sample("CLR-20260101-AAAAAAA1", 0)).unwrap();

        let mut first_writer = stored.clone();
        first_writer.status = RequestStatus::Approved;
        store.update(first_writer).unwrap();

        let mut second_writer = stored;
        second_writer.status = RequestStatus::Rejected;
        assert!(matches!(
            store.update(second_writer),
            Err(StoreError::VersionConflict {
                stored: 2,
                carried: 1
            })
        ));
    }

    #[test]
    fn review_queue_is_oldest_first() {
        let store = InMemoryRequestStore::default();
        store.insert(sample("CLR-20260101-AAAAAAA2", 10)).unwrap();
        store.insert(sample("CLR-20260101-AAAAAAA1", 0)).unwrap();
        let queue = store.awaiting_review().unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue[0].request_date <= queue[1].request_date);
    }

    #[test]
    fn expired_as_of_only_returns_overdue_released() {
        let store = InMemoryRequestStore::default();
        let now = Utc::now();

        let mut overdue = store.insert(sample("CLR-20260101-AAAAAAA1", 0)).unwrap();
        overdue.status = RequestStatus::Released;
        overdue.expiry_date = Some(now - Duration::days(1));
        store.update(overdue).unwrap();

        let mut current = store.insert(sample("CLR-20260101-AAAAAAA2", 1)).unwrap();
        current.status = RequestStatus::Released;
        current.expiry_date = Some(now + Duration::days(30));
        store.update(current).unwrap();

        let expired = store.expired_as_of(now).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].reference_number, "CLR-20260101-AAAAAAA1");
    }
}
