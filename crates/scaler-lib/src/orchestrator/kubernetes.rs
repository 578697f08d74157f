//! Kubernetes Deployment scaling via the `scale` subresource

use super::Orchestrator;
use crate::error::{Result, ScalerError};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::debug;

const FIELD_MANAGER: &str = "predictive-scaler";

/// Scales Deployments in a single namespace
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
    namespace: String,
}

impl KubeOrchestrator {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Connect using in-cluster configuration, falling back to kubeconfig
    pub async fn try_default(namespace: impl Into<String>) -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ScalerError::Config(format!("failed to create Kubernetes client: {}", e)))?;
        Ok(Self::new(client, namespace))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn get_replica_count(&self, service: &str) -> Result<u32> {
        match self.deployments().get_scale(service).await {
            Ok(scale) => {
                let replicas = scale.spec.and_then(|s| s.replicas).unwrap_or(0);
                debug!(service = %service, namespace = %self.namespace, replicas, "Read replica count");
                Ok(replicas.max(0) as u32)
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Err(ScalerError::ServiceNotFound {
                service: service.to_string(),
            }),
            Err(e) => Err(ScalerError::OrchestratorRead {
                service: service.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn set_replica_count(&self, service: &str, replicas: u32) -> Result<()> {
        let patch = serde_json::json!({
            "spec": {
                "replicas": replicas,
            }
        });

        self.deployments()
            .patch_scale(
                service,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| ScalerError::OrchestratorWrite {
                service: service.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "kubernetes"
    }
}
