use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;

use clearance_core::audit::{AuditTrail, InMemoryAuditStore};
use clearance_core::clearance::{
    ClearanceRequest, ClearanceType, ClearanceTypeId, ClearanceWorkflow, DocumentArtifact,
    DocumentIssuer, InMemoryDirectory, InMemoryRequestStore, IssueError, Resident, ResidentId,
    UserId,
};
use clearance_core::config::ClearanceConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type AppWorkflow = ClearanceWorkflow<
    InMemoryRequestStore,
    InMemoryDirectory,
    StampedDocumentIssuer,
    InMemoryAuditStore,
>;

/// Issuer that fabricates a dated artifact path instead of rendering a PDF.
/// Stands in for the real renderer in the demo service; swapping it out is a
/// matter of implementing [`DocumentIssuer`] against the actual storage.
#[derive(Default)]
pub(crate) struct StampedDocumentIssuer {
    issued: Mutex<Vec<String>>,
}

impl DocumentIssuer for StampedDocumentIssuer {
    fn issue(&self, request: &ClearanceRequest) -> Result<DocumentArtifact, IssueError> {
        let generated_at = Utc::now();
        let path = format!(
            "/clearances/Clearance_{}_{}.pdf",
            request.reference_number,
            generated_at.format("%Y%m%d")
        );
        self.issued
            .lock()
            .map_err(|_| IssueError::Storage("issuer state poisoned".to_string()))?
            .push(path.clone());
        Ok(DocumentArtifact { path, generated_at })
    }

    fn delete(&self, path: &str) -> Result<(), IssueError> {
        self.issued
            .lock()
            .map_err(|_| IssueError::Storage("issuer state poisoned".to_string()))?
            .retain(|issued| issued != path);
        Ok(())
    }
}

pub(crate) const SAMPLE_RESIDENT: ResidentId = ResidentId(1);
pub(crate) const SAMPLE_TYPE: ClearanceTypeId = ClearanceTypeId(1);

pub(crate) fn sample_resident_user() -> UserId {
    UserId::new("maria.santos")
}

/// Directory seeded with the catalog a fresh barangay deployment starts from.
/// Fees are in centavos.
pub(crate) fn seeded_directory() -> InMemoryDirectory {
    InMemoryDirectory::with_seed(
        [
            Resident {
                id: SAMPLE_RESIDENT,
                user_id: sample_resident_user(),
                full_name: "Maria Santos".to_string(),
            },
            Resident {
                id: ResidentId(2),
                user_id: UserId::new("jose.ramos"),
                full_name: "Jose Ramos".to_string(),
            },
        ],
        [
            ClearanceType {
                id: SAMPLE_TYPE,
                name: "Barangay Clearance".to_string(),
                fee: 5_000,
                is_active: true,
            },
            ClearanceType {
                id: ClearanceTypeId(2),
                name: "Certificate of Residency".to_string(),
                fee: 3_000,
                is_active: true,
            },
            ClearanceType {
                id: ClearanceTypeId(3),
                name: "Certificate of Indigency".to_string(),
                fee: 0,
                is_active: true,
            },
            ClearanceType {
                id: ClearanceTypeId(4),
                name: "Business Clearance (old schedule)".to_string(),
                fee: 20_000,
                is_active: false,
            },
        ],
    )
}

pub(crate) fn build_workflow(settings: ClearanceConfig) -> Arc<AppWorkflow> {
    let store = Arc::new(InMemoryRequestStore::default());
    let directory = Arc::new(seeded_directory());
    let issuer = Arc::new(StampedDocumentIssuer::default());
    let audit_store = Arc::new(InMemoryAuditStore::default());

    Arc::new(ClearanceWorkflow::new(
        store,
        directory,
        issuer,
        AuditTrail::new(audit_store),
        settings,
    ))
}
