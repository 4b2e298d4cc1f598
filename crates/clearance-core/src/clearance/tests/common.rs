use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::audit::{AuditTrail, InMemoryAuditStore};
use crate::clearance::directory::InMemoryDirectory;
use crate::clearance::documents::{DocumentArtifact, DocumentIssuer, IssueError};
use crate::clearance::domain::{
    ClearanceRequest, ClearanceType, ClearanceTypeId, Resident, ResidentId, UserId,
};
use crate::clearance::store::InMemoryRequestStore;
use crate::clearance::workflow::ClearanceWorkflow;
use crate::config::ClearanceConfig;

pub(crate) const ACTIVE_TYPE: ClearanceTypeId = ClearanceTypeId(1);
pub(crate) const RETIRED_TYPE: ClearanceTypeId = ClearanceTypeId(2);
pub(crate) const ANA: ResidentId = ResidentId(1);
pub(crate) const BEN: ResidentId = ResidentId(2);

pub(crate) fn ana_user() -> UserId {
    UserId::new("resident-ana")
}

pub(crate) fn ben_user() -> UserId {
    UserId::new("resident-ben")
}

pub(crate) fn staff_user() -> UserId {
    UserId::new("staff-clerk")
}

/// Issuer that records every issue/delete and can be switched to fail.
#[derive(Default)]
pub(crate) struct RecordingIssuer {
    pub(crate) fail: AtomicBool,
    pub(crate) issued: AtomicUsize,
    pub(crate) deleted: Mutex<Vec<String>>,
}

impl DocumentIssuer for RecordingIssuer {
    fn issue(&self, request: &ClearanceRequest) -> Result<DocumentArtifact, IssueError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(IssueError::Generation("renderer offline".to_string()));
        }
        let count = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(DocumentArtifact {
            path: format!(
                "/clearances/Clearance_{}_{count}.pdf",
                request.reference_number
            ),
            generated_at: Utc::now(),
        })
    }

    fn delete(&self, path: &str) -> Result<(), IssueError> {
        self.deleted
            .lock()
            .expect("issuer mutex poisoned")
            .push(path.to_string());
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) workflow: Arc<
        ClearanceWorkflow<InMemoryRequestStore, InMemoryDirectory, RecordingIssuer, InMemoryAuditStore>,
    >,
    pub(crate) store: Arc<InMemoryRequestStore>,
    pub(crate) issuer: Arc<RecordingIssuer>,
    pub(crate) audit_store: Arc<InMemoryAuditStore>,
}

pub(crate) fn harness() -> Harness {
    let store = Arc::new(InMemoryRequestStore::default());
    let directory = Arc::new(InMemoryDirectory::with_seed(
        [
            Resident {
                id: ANA,
                user_id: ana_user(),
                full_name: "Ana Reyes".to_string(),
            },
            Resident {
                id: BEN,
                user_id: ben_user(),
                full_name: "Ben Santos".to_string(),
            },
        ],
        [
            ClearanceType {
                id: ACTIVE_TYPE,
                name: "Residency Certificate".to_string(),
                fee: 5_000,
                is_active: true,
            },
            ClearanceType {
                id: RETIRED_TYPE,
                name: "Legacy Permit".to_string(),
                fee: 2_500,
                is_active: false,
            },
        ],
    ));
    let issuer = Arc::new(RecordingIssuer::default());
    let audit_store = Arc::new(InMemoryAuditStore::default());
    let workflow = Arc::new(ClearanceWorkflow::new(
        store.clone(),
        directory,
        issuer.clone(),
        AuditTrail::new(audit_store.clone()),
        ClearanceConfig::default(),
    ));

    Harness {
        workflow,
        store,
        issuer,
        audit_store,
    }
}

impl Harness {
    pub(crate) fn audit_entry_count(&self) -> usize {
        use crate::audit::AuditStore;
        self.audit_store
            .recent(1_000)
            .expect("audit store readable")
            .len()
    }
}
