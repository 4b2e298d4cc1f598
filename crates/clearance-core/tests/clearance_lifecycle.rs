//! End-to-end lifecycle scenarios through the public API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;

use clearance_core::audit::{AuditAction, AuditStore, AuditTrail, InMemoryAuditStore};
use clearance_core::clearance::{
    ClearanceRequest, ClearanceType, ClearanceTypeId, ClearanceWorkflow, DocumentArtifact,
    DocumentIssuer, InMemoryDirectory, InMemoryRequestStore, IssueError, RequestStatus, Resident,
    ResidentId, UserId,
};
use clearance_core::config::ClearanceConfig;

const RESIDENCY: ClearanceTypeId = ClearanceTypeId(1);
const MARIA: ResidentId = ResidentId(10);
const JOSE: ResidentId = ResidentId(11);

struct PdfStubIssuer {
    fail: AtomicBool,
    issued: AtomicUsize,
}

impl PdfStubIssuer {
    fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            issued: AtomicUsize::new(0),
        }
    }
}

impl DocumentIssuer for PdfStubIssuer {
    fn issue(&self, request: &ClearanceRequest) -> Result<DocumentArtifact, IssueError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(IssueError::Generation("template missing".to_string()));
        }
        let count = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(DocumentArtifact {
            path: format!("/clearances/{}_{count}.pdf", request.reference_number),
            generated_at: Utc::now(),
        })
    }

    fn delete(&self, _path: &str) -> Result<(), IssueError> {
        Ok(())
    }
}

struct World {
    workflow: ClearanceWorkflow<
        InMemoryRequestStore,
        InMemoryDirectory,
        PdfStubIssuer,
        InMemoryAuditStore,
    >,
    issuer: Arc<PdfStubIssuer>,
    audit_store: Arc<InMemoryAuditStore>,
}

fn world() -> World {
    let store = Arc::new(InMemoryRequestStore::default());
    let directory = Arc::new(InMemoryDirectory::with_seed(
        [
            Resident {
                id: MARIA,
                user_id: UserId::new("maria"),
                full_name: "Maria Dela Cruz".to_string(),
            },
            Resident {
                id: JOSE,
                user_id: UserId::new("jose"),
                full_name: "Jose Ramos".to_string(),
            },
        ],
        [ClearanceType {
            id: RESIDENCY,
            name: "Residency Certificate".to_string(),
            fee: 5_000,
            is_active: true,
        }],
    ));
    let issuer = Arc::new(PdfStubIssuer::new());
    let audit_store = Arc::new(InMemoryAuditStore::default());
    let workflow = ClearanceWorkflow::new(
        store,
        directory,
        issuer.clone(),
        AuditTrail::new(audit_store.clone()),
        ClearanceConfig::default(),
    );
    World {
        workflow,
        issuer,
        audit_store,
    }
}

fn staff() -> UserId {
    UserId::new("window-3-clerk")
}

#[test]
fn happy_path_runs_submission_to_release_with_full_audit_trail() {
    let world = world();

    let request = world
        .workflow
        .create(MARIA, RESIDENCY, "bank account opening".to_string())
        .expect("submission accepted");
    assert_eq!(request.status, RequestStatus::Submitted);

    let approved = world
        .workflow
        .process(request.id, true, Some("records verified".to_string()), &staff())
        .expect("approval accepted");
    assert_eq!(approved.status, RequestStatus::Approved);

    assert!(world
        .workflow
        .record_payment(request.id, &staff(), Some("OR-2026-0001".to_string()))
        .expect("payment accepted"));

    assert!(world
        .workflow
        .mark_released(request.id, &staff())
        .expect("release accepted"));

    let released = world.workflow.get(request.id).expect("request readable");
    assert_eq!(released.status, RequestStatus::Released);
    assert!(released.is_paid);
    assert_eq!(released.amount_paid, Some(5_000));
    assert!(released.expiry_date.is_some());
    assert!(released.document_path.is_some());

    let history = world
        .audit_store
        .for_entity("ClearanceRequest", &request.id.to_string())
        .expect("history readable");
    let actions: Vec<_> = history.iter().rev().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        [
            AuditAction::RequestCreated,
            AuditAction::RequestApproved,
            AuditAction::PaymentRecorded,
            AuditAction::RequestReleased,
        ]
    );
}

#[test]
fn stranger_cannot_cancel_someone_elses_request() {
    let world = world();
    let request = world
        .workflow
        .create(MARIA, RESIDENCY, "scholarship application".to_string())
        .expect("submission accepted");

    let cancelled = world
        .workflow
        .cancel(request.id, &UserId::new("jose"), "wrong window".to_string())
        .expect("store reachable");

    assert!(!cancelled, "non-owner gets the generic refusal");
    let unchanged = world.workflow.get(request.id).expect("request readable");
    assert_eq!(unchanged.status, RequestStatus::Submitted);
    assert!(unchanged.cancelled_by.is_none());

    let history = world
        .audit_store
        .for_entity("ClearanceRequest", &request.id.to_string())
        .expect("history readable");
    assert_eq!(history.len(), 1, "only the creation entry exists");
}

#[test]
fn release_survives_document_issuance_outage() {
    let world = world();
    let request = world
        .workflow
        .create(MARIA, RESIDENCY, "employment abroad".to_string())
        .expect("submission accepted");
    world
        .workflow
        .process(request.id, true, None, &staff())
        .expect("approval accepted");
    world
        .workflow
        .record_payment(request.id, &staff(), None)
        .expect("payment accepted");

    world.issuer.fail.store(true, Ordering::Relaxed);
    assert!(world
        .workflow
        .mark_released(request.id, &staff())
        .expect("release accepted despite outage"));

    let released = world.workflow.get(request.id).expect("request readable");
    assert_eq!(released.status, RequestStatus::Released);
    assert!(released.document_path.is_none());

    // Once the renderer is back, regeneration fills the gap.
    world.issuer.fail.store(false, Ordering::Relaxed);
    let artifact = world
        .workflow
        .regenerate_document(request.id, &staff())
        .expect("regeneration succeeds");
    let repaired = world.workflow.get(request.id).expect("request readable");
    assert_eq!(repaired.document_path, Some(artifact.path));
}

#[test]
fn lookup_by_reference_and_resident_history_agree() {
    let world = world();
    let first = world
        .workflow
        .create(MARIA, RESIDENCY, "passport renewal".to_string())
        .expect("submission accepted");
    let second = world
        .workflow
        .create(MARIA, RESIDENCY, "business permit".to_string())
        .expect("submission accepted");

    let by_reference = world
        .workflow
        .get_by_reference(&first.reference_number)
        .expect("lookup works")
        .expect("reference known");
    assert_eq!(by_reference.id, first.id);

    let history = world
        .workflow
        .for_resident(MARIA)
        .expect("history readable");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id, "latest submission first");
}
