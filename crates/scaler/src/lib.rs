//! Process wiring for the predictive scaler binary

pub mod api;
pub mod config;
