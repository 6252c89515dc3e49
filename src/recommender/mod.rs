//! Recommenders: pluggable scaling-decision algorithms (spec §4.D).
//!
//! Each recommender looks at the observation window for a single step and
//! proposes a new CPU limit, rounded up to the nearest half core. The
//! recommender never knows about cooldown or min/max clamping; that is
//! `InfraScaler`'s job.

use crate::config::Configuration;
use crate::error::RecommenderError;
use crate::models::Observation;

/// Round up to the nearest 0.5, the "half core" granularity every
/// recommender in this crate scales in.
fn round_up_half(value: f64) -> f64 {
    (value * 2.0).ceil() / 2.0
}

pub trait Recommender {
    /// Propose a new CPU limit from the window's observations. Returns
    /// `None` when the window holds fewer than two points (not enough
    /// signal to decide) -- callers treat that the same as a failed run.
    fn run(&self, window: &[Observation]) -> Option<f64>;
}

/// Scales to the window's maximum observed CPU plus a fixed buffer.
pub struct Additive {
    addend: f64,
}

impl Additive {
    pub fn new(config: &Configuration) -> Self {
        Additive { addend: config.algo_f64("addend", 2.0) }
    }
}

impl Recommender for Additive {
    fn run(&self, window: &[Observation]) -> Option<f64> {
        if window.len() < 2 {
            return None;
        }
        let max = window.iter().map(|o| o.cpu).fold(f64::MIN, f64::max);
        Some(round_up_half(self.addend + max))
    }
}

/// Scales to a multiple of the window's smoothed (rolling-mean) maximum.
pub struct Multiplicative {
    multiplier: f64,
    smoothing_window: usize,
}

impl Multiplicative {
    pub fn new(config: &Configuration) -> Self {
        let smoothing_window = config.algo_i64("smoothing_window", config.window()).max(1) as usize;
        Multiplicative {
            multiplier: config.algo_f64("multiplier", 1.5),
            smoothing_window,
        }
    }

    /// Trailing rolling mean with `min_periods = 1`: the first `k - 1`
    /// points average over however many samples are available so far.
    fn smoothed_max(&self, window: &[Observation]) -> f64 {
        let mut max = f64::MIN;
        for i in 0..window.len() {
            let start = i.saturating_sub(self.smoothing_window - 1);
            let slice = &window[start..=i];
            let mean = slice.iter().map(|o| o.cpu).sum::<f64>() / slice.len() as f64;
            if mean > max {
                max = mean;
            }
        }
        max
    }
}

impl Recommender for Multiplicative {
    fn run(&self, window: &[Observation]) -> Option<f64> {
        if window.len() < 2 {
            return None;
        }
        let smoothed_max = self.smoothed_max(window);
        Some(round_up_half(self.multiplier * smoothed_max))
    }
}

/// Resolve a recommender by name out of `algo_specific_config`'s owning
/// configuration. Unknown names fail loudly rather than silently no-op.
pub fn build(name: &str, config: &Configuration) -> Result<Box<dyn Recommender>, RecommenderError> {
    match name {
        "additive" => Ok(Box::new(Additive::new(config))),
        "multiplicative" => Ok(Box::new(Multiplicative::new(config))),
        other => Err(RecommenderError::UnknownAlgorithm(other.to_string())),
    }
}
