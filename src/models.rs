//! Core data types for VASIM.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The timestamp literal format used by performance log CSVs.
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H:%M:%S:%f";

/// A single per-minute CPU-usage reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: NaiveDateTime,
    pub cpu: f64,
}

/// A recommender decision: the observation time it was made at, the limit
/// enforced at that time, and the limit the recommender proposed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub latest_time: NaiveDateTime,
    pub curr_limit: f64,
    pub new_limit: Option<f64>,
}

/// Aggregate metrics produced once per simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub average_slack: f64,
    pub average_insufficient_cpu: f64,
    pub sum_slack: f64,
    pub sum_insufficient_cpu: f64,
    pub num_scalings: u64,
    pub num_insufficient_cpu: u64,
    pub insufficient_observations_percentage: f64,
    pub slack_percentage: f64,
    pub median_insufficient_cpu: f64,
    pub median_slack: f64,
    pub max_slack: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_record_is_all_zero() {
        let m = MetricsRecord::default();
        assert_eq!(m.sum_slack, 0.0);
        assert_eq!(m.num_scalings, 0);
    }
}
