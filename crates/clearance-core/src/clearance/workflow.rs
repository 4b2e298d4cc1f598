use std::sync::Arc;

use chrono::{Months, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use super::directory::Directory;
use super::documents::{DocumentArtifact, DocumentIssuer, IssueError};
use super::domain::{ClearanceRequest, RequestId, RequestStatus, ResidentId, UserId};
use super::reference;
use super::store::{RequestStore, StoreError};
use crate::audit::{AuditAction, AuditStore, AuditTrail, NewAuditEntry};
use crate::clearance::domain::ClearanceTypeId;
use crate::config::ClearanceConfig;

/// Error raised by the workflow.
///
/// `cancel`, `record_payment`, and `mark_released` additionally use a soft
/// boolean: guard failures (missing request, wrong owner, wrong state) come
/// back as `Ok(false)` so callers can show one generic message, while
/// persistence failures still surface as errors. The conflation is a kept
/// compatibility contract; the real cause is always stated in the log.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("request {0} not found")]
    NotFound(RequestId),
    #[error("request {request} cannot leave status '{}' this way", .current.label())]
    InvalidState {
        request: RequestId,
        current: RequestStatus,
    },
    #[error(transparent)]
    Issuance(#[from] IssueError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The clearance-request state machine.
///
/// Every mutating operation runs read → guard → stamp → version-checked
/// write, and a successful transition appends exactly one audit entry. No
/// code path outside this service assigns `status`.
pub struct ClearanceWorkflow<S, C, D, A> {
    store: Arc<S>,
    directory: Arc<C>,
    issuer: Arc<D>,
    audit: AuditTrail<A>,
    settings: ClearanceConfig,
}

impl<S, C, D, A> ClearanceWorkflow<S, C, D, A>
where
    S: RequestStore,
    C: Directory,
    D: DocumentIssuer,
    A: AuditStore,
{
    pub fn new(
        store: Arc<S>,
        directory: Arc<C>,
        issuer: Arc<D>,
        audit: AuditTrail<A>,
        settings: ClearanceConfig,
    ) -> Self {
        Self {
            store,
            directory,
            issuer,
            audit,
            settings,
        }
    }

    /// Submit a new request on behalf of a resident.
    ///
    /// Fails fast, before any mutation, when the resident is unknown or the
    /// clearance type is unknown or retired.
    pub fn create(
        &self,
        resident_id: ResidentId,
        clearance_type_id: ClearanceTypeId,
        purpose: String,
    ) -> Result<ClearanceRequest, WorkflowError> {
        let resident = self
            .directory
            .resident(resident_id)?
            .ok_or_else(|| WorkflowError::Validation("unknown resident".to_string()))?;

        let clearance_type = self
            .directory
            .clearance_type(clearance_type_id)?
            .ok_or_else(|| WorkflowError::Validation("unknown clearance type".to_string()))?;
        if !clearance_type.is_active {
            return Err(WorkflowError::Validation(format!(
                "clearance type '{}' is no longer offered",
                clearance_type.name
            )));
        }

        let now = Utc::now();
        let reference = reference::generate(&self.settings.reference_prefix, now);
        let request = ClearanceRequest::submitted(
            reference,
            resident_id,
            clearance_type_id,
            purpose,
            now,
        );
        let stored = self.store.insert(request)?;

        info!(
            request = %stored.id,
            resident = stored.resident_id.0,
            clearance_type = clearance_type_id.0,
            reference = %stored.reference_number,
            "clearance request created"
        );
        self.audit.record(
            NewAuditEntry::for_request(AuditAction::RequestCreated, stored.id)
                .by(&resident.user_id)
                .with_transition(
                    json!(null),
                    json!({
                        "status": stored.status.label(),
                        "reference_number": stored.reference_number,
                        "clearance_type_id": clearance_type_id.0,
                        "purpose": stored.purpose,
                    }),
                )
                .from_origin("clearance.create"),
        );

        Ok(stored)
    }

    /// Approve or reject a request sitting in the review queue.
    pub fn process(
        &self,
        request_id: RequestId,
        approve: bool,
        remarks: Option<String>,
        processed_by: &UserId,
    ) -> Result<ClearanceRequest, WorkflowError> {
        let mut request = self.fetch_required(request_id)?;

        if !request.status.is_awaiting_review() {
            warn!(
                request = %request_id,
                status = request.status.label(),
                "process refused outside the review queue"
            );
            return Err(WorkflowError::InvalidState {
                request: request_id,
                current: request.status,
            });
        }

        let previous = request.status;
        request.status = if approve {
            RequestStatus::Approved
        } else {
            RequestStatus::Rejected
        };
        request.processed_by = Some(processed_by.clone());
        request.processed_date = Some(Utc::now());
        request.remarks = remarks;

        let stored = self.store.update(request)?;

        info!(
            request = %request_id,
            outcome = stored.status.label(),
            staff = %processed_by.0,
            "clearance request processed"
        );
        let action = if approve {
            AuditAction::RequestApproved
        } else {
            AuditAction::RequestRejected
        };
        let mut entry = NewAuditEntry::for_request(action, request_id)
            .by(processed_by)
            .with_transition(
                json!({ "status": previous.label() }),
                json!({ "status": stored.status.label() }),
            )
            .from_origin("clearance.process");
        if let Some(remarks) = &stored.remarks {
            entry = entry.with_details(remarks.clone());
        }
        self.audit.record(entry);

        Ok(stored)
    }

    /// Withdraw a request. Only the owning resident may cancel, and only
    /// while the request is still awaiting review. Guard failures return
    /// `Ok(false)` and write nothing, so a repeat cancel is a no-op.
    pub fn cancel(
        &self,
        request_id: RequestId,
        actor: &UserId,
        reason: String,
    ) -> Result<bool, WorkflowError> {
        let Some(mut request) = self.store.fetch(request_id)? else {
            warn!(request = %request_id, "cancel refused: request not found");
            return Ok(false);
        };

        let owner = self.directory.resident_by_user(actor)?;
        if owner.map(|resident| resident.id) != Some(request.resident_id) {
            warn!(
                request = %request_id,
                actor = %actor.0,
                "cancel refused: actor does not own the request"
            );
            return Ok(false);
        }

        if !request.status.is_awaiting_review() {
            warn!(
                request = %request_id,
                status = request.status.label(),
                "cancel refused outside the review queue"
            );
            return Ok(false);
        }

        let previous = request.status;
        request.status = RequestStatus::Cancelled;
        request.cancelled_by = Some(actor.clone());
        request.cancelled_date = Some(Utc::now());
        request.cancellation_reason = Some(reason.clone());

        self.store.update(request)?;

        info!(request = %request_id, actor = %actor.0, %reason, "clearance request cancelled");
        self.audit.record(
            NewAuditEntry::for_request(AuditAction::RequestCancelled, request_id)
                .by(actor)
                .with_transition(
                    json!({ "status": previous.label() }),
                    json!({ "status": RequestStatus::Cancelled.label() }),
                )
                .with_details(reason)
                .from_origin("clearance.cancel"),
        );

        Ok(true)
    }

    /// Record cash collection for an approved request and queue it for
    /// release. The amount is snapshotted from the type fee at collection
    /// time so later fee changes cannot rewrite history.
    pub fn record_payment(
        &self,
        request_id: RequestId,
        staff: &UserId,
        official_receipt_number: Option<String>,
    ) -> Result<bool, WorkflowError> {
        let Some(mut request) = self.store.fetch(request_id)? else {
            warn!(request = %request_id, "payment refused: request not found");
            return Ok(false);
        };

        if request.status != RequestStatus::Approved {
            warn!(
                request = %request_id,
                status = request.status.label(),
                "payment refused outside approved status"
            );
            return Ok(false);
        }

        let amount = self
            .directory
            .clearance_type(request.clearance_type_id)?
            .map(|clearance_type| clearance_type.fee);

        request.is_paid = true;
        request.paid_date = Some(Utc::now());
        request.collected_by = Some(staff.clone());
        request.official_receipt_number = official_receipt_number;
        request.amount_paid = amount;
        request.status = RequestStatus::ForRelease;

        self.store.update(request)?;

        info!(request = %request_id, staff = %staff.0, "payment recorded");
        self.audit.record(
            NewAuditEntry::for_request(AuditAction::PaymentRecorded, request_id)
                .by(staff)
                .with_transition(
                    json!({ "status": RequestStatus::Approved.label(), "is_paid": false }),
                    json!({
                        "status": RequestStatus::ForRelease.label(),
                        "is_paid": true,
                        "amount_paid": amount,
                    }),
                )
                .from_origin("clearance.record_payment"),
        );

        Ok(true)
    }

    /// Hand the document over: start the validity countdown and trigger
    /// issuance. Issuance failure is recorded operationally and never rolls
    /// back the transition; the request stays `Released` without a document
    /// reference until [`Self::regenerate_document`] succeeds.
    pub fn mark_released(
        &self,
        request_id: RequestId,
        staff: &UserId,
    ) -> Result<bool, WorkflowError> {
        let Some(mut request) = self.store.fetch(request_id)? else {
            warn!(request = %request_id, "release refused: request not found");
            return Ok(false);
        };

        if request.status != RequestStatus::ForRelease {
            warn!(
                request = %request_id,
                status = request.status.label(),
                "release refused outside for_release status"
            );
            return Ok(false);
        }

        let now = Utc::now();
        let expiry = now
            .checked_add_months(Months::new(self.settings.validity_months))
            .ok_or_else(|| WorkflowError::Validation("expiry date out of range".to_string()))?;

        request.status = RequestStatus::Released;
        request.released_date = Some(now);
        request.expiry_date = Some(expiry);
        request.processed_by = Some(staff.clone());

        let released = self.store.update(request)?;

        info!(request = %request_id, staff = %staff.0, %expiry, "clearance request released");
        self.audit.record(
            NewAuditEntry::for_request(AuditAction::RequestReleased, request_id)
                .by(staff)
                .with_transition(
                    json!({ "status": RequestStatus::ForRelease.label() }),
                    json!({
                        "status": RequestStatus::Released.label(),
                        "expiry_date": expiry,
                    }),
                )
                .from_origin("clearance.mark_released"),
        );

        self.attach_document(released);

        Ok(true)
    }

    /// Issue the document for a just-released request and store the artifact
    /// reference. Runs after the release commit; every failure path only
    /// logs, leaving the request released and document-less for a later
    /// regenerate.
    fn attach_document(&self, mut request: ClearanceRequest) {
        match self.issuer.issue(&request) {
            Ok(artifact) => {
                request.document_path = Some(artifact.path.clone());
                request.document_generated_date = Some(artifact.generated_at);
                match self.store.update(request) {
                    Ok(_) => {
                        info!(path = %artifact.path, "clearance document issued");
                    }
                    Err(cause) => {
                        error!(%cause, path = %artifact.path, "document issued but reference not stored");
                    }
                }
            }
            Err(cause) => {
                error!(request = %request.id, %cause, "document issuance failed; request remains released");
            }
        }
    }

    /// Re-issue the document for a released request, replacing any earlier
    /// artifact. Safe to repeat.
    pub fn regenerate_document(
        &self,
        request_id: RequestId,
        staff: &UserId,
    ) -> Result<DocumentArtifact, WorkflowError> {
        let mut request = self.fetch_required(request_id)?;

        if request.status != RequestStatus::Released {
            return Err(WorkflowError::InvalidState {
                request: request_id,
                current: request.status,
            });
        }

        if let Some(previous) = request.document_path.take() {
            if let Err(cause) = self.issuer.delete(&previous) {
                warn!(%cause, path = %previous, "stale clearance document left behind");
            }
        }

        let artifact = self.issuer.issue(&request)?;
        request.document_path = Some(artifact.path.clone());
        request.document_generated_date = Some(artifact.generated_at);
        self.store.update(request)?;

        info!(request = %request_id, path = %artifact.path, "clearance document regenerated");
        self.audit.record(
            NewAuditEntry::for_request(AuditAction::DocumentRegenerated, request_id)
                .by(staff)
                .with_details(artifact.path.clone())
                .from_origin("clearance.regenerate_document"),
        );

        Ok(artifact)
    }

    /// Sweep released requests whose validity has lapsed. Idempotent: the
    /// status-plus-deadline guard is the only state the sweep needs, so
    /// re-running it is always safe.
    pub fn mark_expired(&self) -> Result<usize, WorkflowError> {
        let now = Utc::now();
        let overdue = self.store.expired_as_of(now)?;
        let mut expired = 0usize;

        for mut request in overdue {
            let request_id = request.id;
            request.status = RequestStatus::Expired;
            match self.store.update(request) {
                Ok(_) => {
                    expired += 1;
                    self.audit.record(
                        NewAuditEntry::for_request(AuditAction::RequestExpired, request_id)
                            .with_transition(
                                json!({ "status": RequestStatus::Released.label() }),
                                json!({ "status": RequestStatus::Expired.label() }),
                            )
                            .from_origin("clearance.expiry_sweep"),
                    );
                }
                // A concurrent sweep got there first; the record is already
                // expired, so skipping keeps the run idempotent.
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(request = %request_id, "expiry sweep lost the write race, skipping");
                }
                Err(other) => return Err(other.into()),
            }
        }

        if expired > 0 {
            info!(count = expired, "marked released requests as expired");
        }
        Ok(expired)
    }

    pub fn get(&self, request_id: RequestId) -> Result<ClearanceRequest, WorkflowError> {
        self.fetch_required(request_id)
    }

    pub fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ClearanceRequest>, WorkflowError> {
        Ok(self.store.fetch_by_reference(reference)?)
    }

    pub fn for_resident(
        &self,
        resident: ResidentId,
    ) -> Result<Vec<ClearanceRequest>, WorkflowError> {
        Ok(self.store.for_resident(resident)?)
    }

    /// The staff processing queue, oldest submission first.
    pub fn awaiting_review(&self) -> Result<Vec<ClearanceRequest>, WorkflowError> {
        Ok(self.store.awaiting_review()?)
    }

    pub fn with_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<ClearanceRequest>, WorkflowError> {
        Ok(self.store.with_status(status)?)
    }

    pub fn audit(&self) -> &AuditTrail<A> {
        &self.audit
    }

    fn fetch_required(&self, request_id: RequestId) -> Result<ClearanceRequest, WorkflowError> {
        self.store
            .fetch(request_id)?
            .ok_or(WorkflowError::NotFound(request_id))
    }
}
