//! Orchestrator capability
//!
//! The engine only ever reads and sets a workload's replica count, keyed
//! by the service name. The Kubernetes implementation targets the `scale`
//! subresource of a Deployment; the in-memory one backs tests.

mod kubernetes;
mod memory;

pub use kubernetes::KubeOrchestrator;
pub use memory::InMemoryOrchestrator;

use crate::error::Result;
use async_trait::async_trait;

/// Reads and sets the replica count of a workload
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Current replica count; `ServiceNotFound` when the workload is unknown
    async fn get_replica_count(&self, service: &str) -> Result<u32>;

    /// Request a new replica count
    async fn set_replica_count(&self, service: &str, replicas: u32) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
