//! The scaling engine and the loop that drives it

mod engine;
mod r#loop;

#[cfg(test)]
mod tests;

pub use engine::{PassOutcome, ScalingEngine};
pub use r#loop::{ControlLoop, ControlLoopBuilder, LoopConfig, PassSummary};
