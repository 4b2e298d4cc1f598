//! Lifecycle engine for municipal clearance requests.
//!
//! The crate owns the request state machine ([`clearance::ClearanceWorkflow`]),
//! the append-only audit trail ([`audit::AuditTrail`]), reference-number
//! issuance, and the storage/collaborator seams the deployable service plugs
//! adapters into. HTTP handlers live in [`clearance::router`]; server wiring,
//! metrics, and the CLI belong to the `clearance-api` service crate.

pub mod audit;
pub mod clearance;
pub mod config;
pub mod error;
pub mod telemetry;
