use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::directory::Directory;
use super::documents::DocumentIssuer;
use super::store::RequestStore;
use super::workflow::ClearanceWorkflow;
use crate::audit::AuditStore;

/// Periodic sweep that expires released clearances past their validity.
///
/// Stateless and idempotent: each tick simply calls
/// [`ClearanceWorkflow::mark_expired`], whose status-plus-deadline guard
/// makes repeat runs harmless, so the cadence is purely operational.
pub struct ExpiryJob<S, C, D, A> {
    workflow: Arc<ClearanceWorkflow<S, C, D, A>>,
    interval: Duration,
}

impl<S, C, D, A> ExpiryJob<S, C, D, A>
where
    S: RequestStore,
    C: Directory,
    D: DocumentIssuer,
    A: AuditStore,
{
    pub fn new(workflow: Arc<ClearanceWorkflow<S, C, D, A>>, interval: Duration) -> Self {
        Self { workflow, interval }
    }

    /// Run the sweep forever. Spawn this on the runtime at startup.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.workflow.mark_expired() {
                Ok(0) => {}
                Ok(count) => info!(count, "expiry sweep completed"),
                Err(cause) => error!(%cause, "expiry sweep failed; will retry next tick"),
            }
        }
    }
}
