//! Scaler configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! file at `CONFIG_PATH`, then `SCALER_*` environment variables
//! (`__` separates nested keys, e.g. `SCALER_SCALING__MIN_REPLICAS=3`).

use anyhow::{bail, Context, Result};
use scaler_lib::{PrometheusConfig, ScalingLimits};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "/app/config/scaler.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct ScalerConfig {
    /// Deployments evaluated on every tick
    #[serde(default)]
    pub services: Vec<String>,

    /// Namespace the deployments live in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Control loop interval in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default)]
    pub prometheus: PrometheusConfig,

    #[serde(default)]
    pub scaling: ScalingLimits,
}

fn default_namespace() -> String {
    "ai-monitor".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_interval() -> u64 {
    60
}

impl ScalerConfig {
    /// Load from `CONFIG_PATH` (if present) and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SCALER")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("services")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let config: ScalerConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scaling.validate()?;
        self.prometheus
            .metrics_query()
            .validate()
            .context("invalid prometheus query window")?;
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }
        if self.services.iter().any(|s| s.trim().is_empty()) {
            bail!("service names must not be empty");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
