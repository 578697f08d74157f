//! Scaling decisions: policy, suppression and execution

mod cooldown;
mod executor;
mod policy;

pub use cooldown::{CooldownGate, GateVerdict, LastActions};
pub use executor::ScalingExecutor;
pub use policy::ScalingPolicy;
