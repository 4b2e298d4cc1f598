use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::ClearanceRequest;

/// Storage reference for a generated clearance document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentArtifact {
    /// Web path to the rendered document, e.g.
    /// `/clearances/Clearance_CLR-20260213-4F1A09B2_20260213.pdf`.
    pub path: String,
    pub generated_at: DateTime<Utc>,
}

/// Document rendering/storage collaborator. The engine only calls it and
/// records the returned reference; layout and filesystem mechanics live
/// elsewhere. Issuance runs after the release transition commits, so a
/// failure here never rolls the transition back.
pub trait DocumentIssuer: Send + Sync {
    fn issue(&self, request: &ClearanceRequest) -> Result<DocumentArtifact, IssueError>;
    /// Remove a previously issued artifact; used before re-issuing.
    fn delete(&self, path: &str) -> Result<(), IssueError>;
}

/// Error enumeration for issuance failures.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("document generation failed: {0}")]
    Generation(String),
    #[error("document storage unavailable: {0}")]
    Storage(String),
    #[error("document issuance timed out after {seconds}s")]
    Timeout { seconds: u64 },
}
