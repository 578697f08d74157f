//! Applies accepted decisions against the orchestrator

use super::LastActions;
use crate::models::ScalingDecision;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use tracing::{error, info};

/// Issues the replica change for a decision.
///
/// Failures are logged and reported as `false`; there is no internal
/// retry, the next pass re-evaluates from fresh state.
pub struct ScalingExecutor {
    orchestrator: Arc<dyn Orchestrator>,
    last_actions: Arc<LastActions>,
}

impl ScalingExecutor {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, last_actions: Arc<LastActions>) -> Self {
        Self {
            orchestrator,
            last_actions,
        }
    }

    pub async fn apply(&self, decision: &ScalingDecision) -> bool {
        match self
            .orchestrator
            .set_replica_count(&decision.service, decision.target_replicas)
            .await
        {
            Ok(()) => {
                self.last_actions.record(&decision.service, decision.timestamp);
                info!(
                    service = %decision.service,
                    from = decision.current_replicas,
                    to = decision.target_replicas,
                    orchestrator = self.orchestrator.name(),
                    "Scaled service"
                );
                true
            }
            Err(e) => {
                error!(
                    service = %decision.service,
                    target_replicas = decision.target_replicas,
                    error = %e,
                    "Failed to scale service"
                );
                false
            }
        }
    }
}
