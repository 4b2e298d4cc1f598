//! The clearance-request lifecycle: domain types, the workflow state
//! machine, reference numbers, storage and collaborator seams, the HTTP
//! router, and the expiry sweep.

pub mod directory;
pub mod documents;
pub mod domain;
pub mod expiry;
pub mod reference;
pub mod router;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use directory::{Directory, InMemoryDirectory};
pub use documents::{DocumentArtifact, DocumentIssuer, IssueError};
pub use domain::{
    ClearanceRequest, ClearanceType, ClearanceTypeId, RequestId, RequestStatus, RequestView,
    Resident, ResidentId, UserId,
};
pub use expiry::ExpiryJob;
pub use router::clearance_router;
pub use store::{InMemoryRequestStore, RequestStore, StoreError};
pub use workflow::{ClearanceWorkflow, WorkflowError};
