use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::directory::Directory;
use super::documents::DocumentIssuer;
use super::domain::{ClearanceTypeId, RequestId, RequestStatus, ResidentId, UserId};
use super::store::RequestStore;
use super::workflow::{ClearanceWorkflow, WorkflowError};
use crate::audit::{AuditAction, AuditQuery, AuditStore};

/// Router builder exposing the clearance lifecycle and audit read endpoints.
/// The calling actor is always explicit in the payload; there is no ambient
/// "current user".
pub fn clearance_router<S, C, D, A>(workflow: Arc<ClearanceWorkflow<S, C, D, A>>) -> Router
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/clearances",
            post(submit_handler::<S, C, D, A>).get(list_handler::<S, C, D, A>),
        )
        .route("/api/v1/clearances/:id", get(get_handler::<S, C, D, A>))
        .route(
            "/api/v1/clearances/:id/process",
            post(process_handler::<S, C, D, A>),
        )
        .route(
            "/api/v1/clearances/:id/cancel",
            post(cancel_handler::<S, C, D, A>),
        )
        .route(
            "/api/v1/clearances/:id/payment",
            post(payment_handler::<S, C, D, A>),
        )
        .route(
            "/api/v1/clearances/:id/release",
            post(release_handler::<S, C, D, A>),
        )
        .route(
            "/api/v1/clearances/:id/document",
            post(regenerate_handler::<S, C, D, A>),
        )
        .route("/api/v1/audit", get(audit_query_handler::<S, C, D, A>))
        .route(
            "/api/v1/audit/recent",
            get(audit_recent_handler::<S, C, D, A>),
        )
        .route(
            "/api/v1/audit/:entity_type/:entity_id",
            get(audit_entity_handler::<S, C, D, A>),
        )
        .with_state(workflow)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    resident_id: i64,
    clearance_type_id: i64,
    purpose: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProcessRequest {
    approve: bool,
    #[serde(default)]
    remarks: Option<String>,
    staff_user_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelRequest {
    actor_user_id: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentRequest {
    staff_user_id: String,
    #[serde(default)]
    official_receipt_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffActionRequest {
    staff_user_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListFilter {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    resident_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditFilter {
    #[serde(default)]
    actor_user_id: Option<String>,
    #[serde(default)]
    entity_type: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    from: Option<DateTime<Utc>>,
    #[serde(default)]
    until: Option<DateTime<Utc>>,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentFilter {
    #[serde(default = "default_recent")]
    count: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

fn default_recent() -> usize {
    50
}

fn error_response(status: StatusCode, error: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn workflow_error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidState { .. } => StatusCode::CONFLICT,
        WorkflowError::Issuance(_) | WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error)
}

/// Map the soft boolean the guarded operations return: the contract keeps
/// not-found, wrong-owner, and wrong-state indistinguishable to callers.
fn soft_outcome(outcome: Result<bool, WorkflowError>) -> Response {
    match outcome {
        Ok(true) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Ok(false) => (StatusCode::CONFLICT, Json(json!({ "ok": false }))).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn submit_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Json(payload): Json<SubmitRequest>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    match workflow.create(
        ResidentId(payload.resident_id),
        ClearanceTypeId(payload.clearance_type_id),
        payload.purpose,
    ) {
        Ok(request) => (StatusCode::ACCEPTED, Json(request.status_view())).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn get_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Path(id): Path<i64>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    match workflow.get(RequestId(id)) {
        Ok(request) => (StatusCode::OK, Json(request.status_view())).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

/// Without filters this lists the staff review queue; `status` and
/// `resident_id` narrow to the matching requests instead.
pub(crate) async fn list_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Query(filter): Query<ListFilter>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    let result = match (&filter.status, filter.resident_id) {
        (Some(label), _) => match RequestStatus::from_label(label) {
            Some(status) => workflow.with_status(status),
            None => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("unknown status '{label}'"),
                )
            }
        },
        (None, Some(resident)) => workflow.for_resident(ResidentId(resident)),
        (None, None) => workflow.awaiting_review(),
    };

    match result {
        Ok(requests) => {
            let views: Vec<_> = requests
                .iter()
                .map(|request| request.status_view())
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn process_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Path(id): Path<i64>,
    Json(payload): Json<ProcessRequest>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    let staff = UserId::new(payload.staff_user_id);
    match workflow.process(RequestId(id), payload.approve, payload.remarks, &staff) {
        Ok(request) => (StatusCode::OK, Json(request.status_view())).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn cancel_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Path(id): Path<i64>,
    Json(payload): Json<CancelRequest>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    let actor = UserId::new(payload.actor_user_id);
    soft_outcome(workflow.cancel(RequestId(id), &actor, payload.reason))
}

pub(crate) async fn payment_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Path(id): Path<i64>,
    Json(payload): Json<PaymentRequest>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    let staff = UserId::new(payload.staff_user_id);
    soft_outcome(workflow.record_payment(
        RequestId(id),
        &staff,
        payload.official_receipt_number,
    ))
}

pub(crate) async fn release_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Path(id): Path<i64>,
    Json(payload): Json<StaffActionRequest>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    let staff = UserId::new(payload.staff_user_id);
    soft_outcome(workflow.mark_released(RequestId(id), &staff))
}

pub(crate) async fn regenerate_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Path(id): Path<i64>,
    Json(payload): Json<StaffActionRequest>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    let staff = UserId::new(payload.staff_user_id);
    match workflow.regenerate_document(RequestId(id), &staff) {
        Ok(artifact) => (StatusCode::OK, Json(artifact)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn audit_query_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Query(filter): Query<AuditFilter>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    let action = match filter.action.as_deref() {
        Some(label) => match AuditAction::from_label(label) {
            Some(action) => Some(action),
            None => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("unknown action '{label}'"),
                )
            }
        },
        None => None,
    };

    let query = AuditQuery {
        actor_user_id: filter.actor_user_id.map(UserId::new),
        entity_type: filter.entity_type,
        action,
        from: filter.from,
        until: filter.until,
        page: filter.page,
        page_size: filter.page_size,
    };

    match workflow.audit().query(query) {
        Ok((items, total)) => (
            StatusCode::OK,
            Json(json!({ "items": items, "total": total })),
        )
            .into_response(),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error),
    }
}

pub(crate) async fn audit_recent_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Query(filter): Query<RecentFilter>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    match workflow.audit().recent(filter.count) {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error),
    }
}

pub(crate) async fn audit_entity_handler<S, C, D, A>(
    State(workflow): State<Arc<ClearanceWorkflow<S, C, D, A>>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Response
where
    S: RequestStore + 'static,
    C: Directory + 'static,
    D: DocumentIssuer + 'static,
    A: AuditStore + 'static,
{
    match workflow.audit().for_entity(&entity_type, &entity_id) {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error),
    }
}
