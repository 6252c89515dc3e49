//! VASIM: a vertical autoscaling simulator and parameter-tuning engine.
//!
//! The crate replays a recorded CPU-usage trace through a pluggable
//! recommender/scaler pair, one decision at a time, and can sweep a
//! parameter space across many such simulations in parallel to search for
//! good configurations.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and types
//! - **config**: Configuration loading, validation and persistence
//! - **trace**: Trace loading from recorded performance logs
//! - **provider**: Simulated cluster state (windowing, clamping, clock)
//! - **recommender**: Pluggable scaling-decision algorithms
//! - **scaler**: Cooldown-aware enforcement of recommended limits
//! - **simulator**: The replay loop tying the above together
//! - **metrics**: Post-run slack/insufficient-CPU aggregation
//! - **tuning**: Parameter-space search across parallel simulation workers
//! - **logging**: Per-run structured log files

#![allow(dead_code)]

pub mod error;
pub mod models;

pub mod config;
pub mod trace;
pub mod provider;
pub mod recommender;
pub mod scaler;
pub mod simulator;
pub mod metrics;
pub mod tuning;
pub mod logging;

pub use error::{
    ConfigError, RecommenderError, Result, ScalerError, SimulatorError, TraceError, TuningError,
    VasimError,
};
pub use models::{Decision, MetricsRecord, Observation};

pub use config::Configuration;
pub use provider::ClusterStateProvider;
pub use scaler::InfraScaler;
pub use simulator::Simulator;
pub use trace::Trace;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_constant_is_set() {
        assert!(!VERSION.is_empty());
    }
}
