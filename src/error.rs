//! Unified error type hierarchy for VASIM.
//!
//! Provides structured error handling with `ConfigError`, `TraceError`,
//! `RecommenderError`, `ScalerError`, `SimulatorError`, and `TuningError`.

use std::io;
use thiserror::Error;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Trace-loading errors.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("No trace data found in {0}")]
    NoTraceData(String),

    #[error("IO error while loading trace: {0}")]
    IoError(#[from] io::Error),
}

/// Recommender invocation errors. Always recoverable at the simulator level.
#[derive(Error, Debug)]
pub enum RecommenderError {
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Recommender failed: {0}")]
    Failed(String),
}

/// Infra scaler errors.
#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("Invalid scaler configuration: {0}")]
    InvalidConfig(String),
}

/// Replay simulator errors. Fatal for the affected run.
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Recommender(#[from] RecommenderError),

    #[error(transparent)]
    Scaler(#[from] ScalerError),

    #[error("IO error during simulation: {0}")]
    IoError(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Tuning orchestrator errors. Never aborts the sweep; recorded per worker.
#[derive(Error, Debug)]
pub enum TuningError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Worker {0} failed: {1}")]
    WorkerFailure(String, String),

    #[error("IO error in tuning orchestrator: {0}")]
    IoError(#[from] io::Error),
}

/// Crate-level aggregate error, used at the CLI boundary.
#[derive(Error, Debug)]
pub enum VasimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Simulator(#[from] SimulatorError),

    #[error(transparent)]
    Tuning(#[from] TuningError),
}

pub type Result<T> = std::result::Result<T, VasimError>;
