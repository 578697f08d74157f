//! In-memory orchestrator used by tests and local runs

use super::Orchestrator;
use crate::error::{Result, ScalerError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Keeps replica counts in a map and records every write
#[derive(Debug, Default)]
pub struct InMemoryOrchestrator {
    replicas: DashMap<String, u32>,
    writes: Mutex<Vec<(String, u32)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workload with an initial replica count
    pub fn with_service(self, service: impl Into<String>, replicas: u32) -> Self {
        self.replicas.insert(service.into(), replicas);
        self
    }

    pub fn insert(&self, service: impl Into<String>, replicas: u32) {
        self.replicas.insert(service.into(), replicas);
    }

    /// Make subsequent reads fail with `OrchestratorRead`
    pub fn set_failing_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    /// Make subsequent writes fail with `OrchestratorWrite`
    pub fn set_failing_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// All successful writes, in order
    pub async fn writes(&self) -> Vec<(String, u32)> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl Orchestrator for InMemoryOrchestrator {
    async fn get_replica_count(&self, service: &str) -> Result<u32> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ScalerError::OrchestratorRead {
                service: service.to_string(),
                reason: "injected read failure".to_string(),
            });
        }
        self.replicas
            .get(service)
            .map(|r| *r.value())
            .ok_or_else(|| ScalerError::ServiceNotFound {
                service: service.to_string(),
            })
    }

    async fn set_replica_count(&self, service: &str, replicas: u32) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ScalerError::OrchestratorWrite {
                service: service.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        if !self.replicas.contains_key(service) {
            return Err(ScalerError::ServiceNotFound {
                service: service.to_string(),
            });
        }
        self.replicas.insert(service.to_string(), replicas);
        self.writes.lock().await.push((service.to_string(), replicas));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
