//! The replay loop (spec §4.F): ties trace, provider, recommender and
//! scaler together into a single deterministic simulation run.

use crate::config::Configuration;
use crate::error::{RecommenderError, SimulatorError};
use crate::models::Decision;
use crate::provider::ClusterStateProvider;
use crate::recommender::{self, Recommender};
use crate::scaler::InfraScaler;
use crate::trace::Trace;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

pub struct Simulator {
    provider: ClusterStateProvider,
    scaler: InfraScaler,
    recommender: Box<dyn Recommender>,
    decisions: Vec<Decision>,
}

impl Simulator {
    /// Build a simulator over `trace` using the named recommender
    /// algorithm. `initial_cpu_limit` seeds the enforced limit, defaulting
    /// to `general_config.max_cpu_limit`.
    pub fn new(
        trace: Trace,
        config: &Configuration,
        algorithm: &str,
        initial_cpu_limit: Option<f64>,
    ) -> Result<Self, SimulatorError> {
        let initial_cpu_limit = initial_cpu_limit.unwrap_or_else(|| config.max_cpu_limit() as f64);
        let mut provider = ClusterStateProvider::new(trace, config, Some(initial_cpu_limit))?;
        provider.set_cpu_limit(initial_cpu_limit);

        let scaler = InfraScaler::new(config);
        let recommender = recommender::build(algorithm, config)?;

        Ok(Simulator {
            provider,
            scaler,
            recommender,
            decisions: Vec::new(),
        })
    }

    /// Run a single step: fetch the next window, run the recommender if
    /// there's enough data, log the decision, advance the clock, then
    /// attempt to scale. A window with fewer than two points only
    /// advances the clock -- no decision is logged. A recommender that
    /// panics is treated as a recoverable failure (spec §7
    /// `RecommenderFailure`): the step logs a no-decision and the loop
    /// continues rather than unwinding the whole run.
    pub fn step(&mut self) {
        let (window, latest_time) = self.provider.get_next_recorded_data();
        if window.len() < 2 {
            self.provider.advance_time();
            return;
        }

        let recommender = &self.recommender;
        let new_limit = match panic::catch_unwind(AssertUnwindSafe(|| recommender.run(&window))) {
            Ok(limit) => limit,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "recommender panicked".to_string());
                log::warn!("{}", RecommenderError::Failed(message));
                None
            }
        };
        self.decisions.push(Decision {
            latest_time,
            curr_limit: self.provider.get_current_cpu_limit(),
            new_limit,
        });

        self.provider.advance_time();

        if let Some(limit) = new_limit {
            let now = self.provider.current_time();
            self.scaler.scale(&mut self.provider, limit, now);
        }
    }

    /// Run to completion: the loop terminates once `current_time + lag`
    /// would reach or pass the trace's last observation.
    pub fn run(&mut self) {
        while !self.provider.is_done() {
            self.step();
        }
    }

    /// Run to completion, invoking `on_progress` with a `[0, 1]` fraction
    /// of elapsed simulated time after each step.
    pub fn run_with_progress<F: FnMut(f64)>(&mut self, mut on_progress: F) {
        let total_minutes = (self.provider.end_time() - self.provider.current_time()).num_minutes().max(1) as f64;
        let start_time = self.provider.current_time();

        while !self.provider.is_done() {
            self.step();
            let elapsed = (self.provider.current_time() - start_time).num_minutes() as f64;
            on_progress((elapsed / total_minutes).min(1.0));
        }
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn current_cpu_limit(&self) -> f64 {
        self.provider.get_current_cpu_limit()
    }

    /// The full (possibly clamped) observation trace this run replayed.
    pub fn observations(&self) -> &[crate::models::Observation] {
        self.provider.observations()
    }

    /// Write the (possibly clamped) observation trace back to disk.
    pub fn flush_trace(&self, path: &Path) -> Result<(), SimulatorError> {
        self.provider.flush_metrics_data(path)?;
        Ok(())
    }

    /// Write the decision log as `LATEST_TIME,CURR_LIMIT,NEW_LIMIT`.
    pub fn write_decisions_csv(&self, path: &Path) -> Result<(), SimulatorError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(["LATEST_TIME", "CURR_LIMIT", "NEW_LIMIT"])?;
        for decision in &self.decisions {
            writer.write_record([
                decision.latest_time.format(crate::models::TIMESTAMP_FORMAT).to_string(),
                decision.curr_limit.to_string(),
                decision.new_limit.map(|v| v.to_string()).unwrap_or_default(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
