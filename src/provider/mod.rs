//! Cluster state provider: the simulator's view of "the cluster" (spec
//! §4.C). Wraps a `Trace` with a simulated clock, replaying observations
//! window by window and clamping actuals to whatever limit is currently
//! enforced, the way a throttled workload's lag window would play out in
//! production.

use crate::config::Configuration;
use crate::error::TraceError;
use crate::models::Observation;
use crate::trace::Trace;
use chrono::{Duration, NaiveDateTime};
use std::path::Path;

/// Replays a `Trace` against a simulated clock that advances by `lag`
/// minutes each step, clamping the trailing lag window to whatever CPU
/// limit is currently enforced before handing out the next window.
pub struct ClusterStateProvider {
    trace: Trace,
    window_minutes: i64,
    lag_minutes: i64,
    max_cpu_limit: f64,
    current_time: NaiveDateTime,
    end_time: NaiveDateTime,
    curr_cpu_limit: f64,
    last_scaling_time: NaiveDateTime,
}

impl ClusterStateProvider {
    /// Build a provider over `trace`, starting the clock at the trace's
    /// first observation. `initial_cpu_limit` seeds the enforced limit;
    /// defaults to `general_config.max_cpu_limit` when absent.
    pub fn new(
        trace: Trace,
        config: &Configuration,
        initial_cpu_limit: Option<f64>,
    ) -> Result<Self, TraceError> {
        let start_time = trace
            .start_time()
            .ok_or_else(|| TraceError::NoTraceData("trace has no observations".to_string()))?;
        let end_time = trace.end_time().unwrap();
        let curr_cpu_limit = initial_cpu_limit.unwrap_or_else(|| config.max_cpu_limit() as f64);

        Ok(ClusterStateProvider {
            trace,
            window_minutes: config.window(),
            lag_minutes: config.lag(),
            max_cpu_limit: config.max_cpu_limit() as f64,
            current_time: start_time,
            end_time,
            curr_cpu_limit,
            last_scaling_time: start_time,
        })
    }

    /// Clamp the trailing lag window to the enforced limit, then return the
    /// observations in `[current_time - window, current_time]` along with
    /// the time of the latest observation in that window (or `current_time`
    /// if the window is empty).
    pub fn get_next_recorded_data(&mut self) -> (Vec<Observation>, NaiveDateTime) {
        let clamp_from = self.current_time - Duration::minutes(self.lag_minutes);
        self.trace
            .clamp_range(clamp_from, self.current_time, self.curr_cpu_limit);

        let window_from = self.current_time - Duration::minutes(self.window_minutes);
        let window = self.trace.window(window_from, self.current_time);
        let latest_time = window.last().map(|o| o.time).unwrap_or(self.current_time);
        (window.to_vec(), latest_time)
    }

    /// Record a new enforced CPU limit. Updates `last_scaling_time` only
    /// when the limit actually changes.
    pub fn set_cpu_limit(&mut self, new_cpu_limit: f64) {
        if (new_cpu_limit - self.curr_cpu_limit).abs() > f64::EPSILON {
            self.last_scaling_time = self.current_time;
        }
        self.curr_cpu_limit = new_cpu_limit;
    }

    pub fn get_current_cpu_limit(&self) -> f64 {
        self.curr_cpu_limit
    }

    pub fn get_total_cpu(&self) -> f64 {
        self.max_cpu_limit
    }

    /// The full (possibly clamped) observation trace, e.g. for metrics
    /// calculation once a run has finished.
    pub fn observations(&self) -> &[Observation] {
        self.trace.observations()
    }

    pub fn last_scaling_time(&self) -> NaiveDateTime {
        self.last_scaling_time
    }

    pub fn current_time(&self) -> NaiveDateTime {
        self.current_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    /// Advance the simulated clock by `lag` minutes.
    pub fn advance_time(&mut self) {
        self.current_time += Duration::minutes(self.lag_minutes);
    }

    /// True once the clock, advanced one more lag step, would reach or
    /// pass the trace's last observation.
    pub fn is_done(&self) -> bool {
        self.current_time + Duration::minutes(self.lag_minutes) >= self.end_time
    }

    /// Write the (possibly clamped) trace back out, e.g. as
    /// `perf_event_log.csv` in a simulation's workspace.
    pub fn flush_metrics_data(&self, path: &Path) -> Result<(), TraceError> {
        self.trace.write_csv(path)
    }
}
