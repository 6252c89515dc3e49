//! Tuning orchestrator (spec §4.H): explores a parameter space across a
//! pool of worker threads, running one simulation per generated
//! configuration and collecting its metrics.
//!
//! The worker pool is a straightforward job-queue fan-out over
//! `crossbeam_channel`, the same pattern the teacher crate uses to fan
//! log records out to multiple sinks: one channel hands out jobs, every
//! worker thread drains it until empty, and a second channel collects
//! results back on the main thread.

use crate::config::Configuration;
use crate::error::{ConfigError, TuningError};
use crate::metrics;
use crate::models::MetricsRecord;
use crate::simulator::Simulator;
use crate::trace::Trace;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use uuid::Uuid;

/// The default seed for the `random` strategy, matching the fixed seed
/// the parameter tuner has always run with for reproducible sweeps.
pub const DEFAULT_RANDOM_SEED: u64 = 1234;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    General,
    AlgoSpecific,
    Prediction,
}

/// The parameters to sweep, grouped by which config section they live in.
/// Each key maps to the list of candidate values to explore.
#[derive(Debug, Clone, Default)]
pub struct ParamSpace {
    pub general: BTreeMap<String, Vec<Value>>,
    pub algo_specific: BTreeMap<String, Vec<Value>>,
    pub prediction: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Clone)]
pub enum Strategy {
    /// Full cartesian product of every candidate list.
    Grid,
    /// `num_combinations` independent random picks, one value per key,
    /// drawn from a seeded RNG for reproducibility.
    Random { num_combinations: usize, seed: u64 },
}

pub struct TuningResult {
    pub worker_id: String,
    pub config: Configuration,
    pub metrics: Option<MetricsRecord>,
}

/// Check every parameter named in `params` actually exists in `base`'s
/// corresponding section before spending any worker time on it.
fn validate_keys(base: &Configuration, params: &ParamSpace) -> Result<(), ConfigError> {
    for key in params.general.keys() {
        if !base.general_config.contains_key(key) {
            return Err(ConfigError::UnknownParameter(key.clone()));
        }
    }
    for key in params.algo_specific.keys() {
        if !base.algo_specific_config.contains_key(key) {
            return Err(ConfigError::UnknownParameter(key.clone()));
        }
    }
    for key in params.prediction.keys() {
        if !base.prediction_config.contains_key(key) {
            return Err(ConfigError::UnknownParameter(key.clone()));
        }
    }
    Ok(())
}

fn flattened_entries(params: &ParamSpace) -> Vec<(Section, String, Vec<Value>)> {
    let mut entries = Vec::new();
    for (k, v) in &params.general {
        entries.push((Section::General, k.clone(), v.clone()));
    }
    for (k, v) in &params.algo_specific {
        entries.push((Section::AlgoSpecific, k.clone(), v.clone()));
    }
    for (k, v) in &params.prediction {
        entries.push((Section::Prediction, k.clone(), v.clone()));
    }
    entries
}

fn apply(base: &Configuration, choices: &[(Section, String, Value)]) -> Configuration {
    let mut config = base.clone();
    for (section, key, value) in choices {
        let map = match section {
            Section::General => &mut config.general_config,
            Section::AlgoSpecific => &mut config.algo_specific_config,
            Section::Prediction => &mut config.prediction_config,
        };
        map.insert(key.clone(), value.clone());
    }
    // Swept keys can legitimately include min_cpu_limit/max_cpu_limit
    // (validate_keys only checks the key exists, not that the combination
    // is sane), so re-validate to catch an inverted min>max before this
    // config ever reaches a scaler.
    config.validate();
    config
}

fn grid_configs(base: &Configuration, entries: &[(Section, String, Vec<Value>)]) -> Vec<Configuration> {
    let mut combinations: Vec<Vec<(Section, String, Value)>> = vec![Vec::new()];
    for (section, key, values) in entries {
        let mut next = Vec::new();
        for combo in &combinations {
            for value in values {
                let mut extended = combo.clone();
                extended.push((*section, key.clone(), value.clone()));
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations.iter().map(|choices| apply(base, choices)).collect()
}

fn random_configs(
    base: &Configuration,
    entries: &[(Section, String, Vec<Value>)],
    num_combinations: usize,
    seed: u64,
) -> Vec<Configuration> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_combinations)
        .map(|_| {
            let choices: Vec<(Section, String, Value)> = entries
                .iter()
                .map(|(section, key, values)| {
                    let picked = values.choose(&mut rng).cloned().unwrap();
                    (*section, key.clone(), picked)
                })
                .collect();
            apply(base, &choices)
        })
        .collect()
}

/// Generate every configuration to evaluate. The entire list is built
/// up front (sampling for `random` is consumed in full here) so worker
/// scheduling order never affects which configurations get run.
pub fn generate_configs(base: &Configuration, params: &ParamSpace, strategy: &Strategy) -> Vec<Configuration> {
    let entries = flattened_entries(params);
    match strategy {
        Strategy::Grid => grid_configs(base, &entries),
        Strategy::Random { num_combinations, seed } => random_configs(base, &entries, *num_combinations, *seed),
    }
}

/// Python-compatible worker id: `cfg-` followed by the first 8 hex
/// digits of a v4 UUID, a dash, then the 4 hex digits that would fall in
/// the second dash-delimited group of the UUID's canonical (hyphenated)
/// form -- `hex[8..12]` on the dash-free string.
fn make_worker_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("cfg-{}-{}", &hex[0..8], &hex[8..12])
}

/// Run one simulation per generated configuration across `num_workers`
/// threads, each in its own isolated workspace under
/// `{data_dir}_tuning/target_{worker_id}/`. A worker whose simulation
/// fails writes `error_log.txt` into its own workspace and reports a
/// `None` metrics record rather than aborting the sweep.
#[allow(clippy::too_many_arguments)]
pub fn run(
    base_config: &Configuration,
    params: &ParamSpace,
    strategy: Strategy,
    trace: &Trace,
    algorithm: &str,
    initial_cpu_limit: Option<f64>,
    data_dir: &Path,
    num_workers: usize,
) -> Result<Vec<TuningResult>, TuningError> {
    validate_keys(base_config, params)?;
    let configs = generate_configs(base_config, params, &strategy);

    let tuning_dir: PathBuf = {
        let mut dir = data_dir.as_os_str().to_os_string();
        dir.push("_tuning");
        PathBuf::from(dir)
    };
    fs::create_dir_all(&tuning_dir)?;

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<Configuration>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<TuningResult>();
    for config in configs {
        job_tx.send(config).expect("receiver outlives sender for the duration of this call");
    }
    drop(job_tx);

    let worker_count = num_workers.max(1);
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let job_rx = job_rx.clone();
        let result_tx = result_tx.clone();
        let trace = trace.clone();
        let algorithm = algorithm.to_string();
        let tuning_dir = tuning_dir.clone();

        handles.push(thread::spawn(move || {
            while let Ok(mut config) = job_rx.recv() {
                let worker_id = make_worker_id();
                let target_dir = tuning_dir.join(format!("target_{}", worker_id));
                if fs::create_dir_all(&target_dir).is_err() {
                    continue;
                }
                // Stamp the worker id on the config so the persisted
                // metadata.json records which worker produced it.
                config.general_config.insert("uuid".to_string(), Value::from(worker_id.clone()));

                let outcome = Simulator::new(trace.clone(), &config, &algorithm, initial_cpu_limit)
                    .map(|mut sim| {
                        sim.run();
                        let metrics = metrics::calculate(sim.decisions(), trace.observations());
                        let _ = sim.write_decisions_csv(&target_dir.join("decisions.csv"));
                        let _ = crate::config::to_file(&config, &target_dir.join("metadata.json"));
                        if let Ok(json) = serde_json::to_string_pretty(&metrics) {
                            let _ = fs::write(target_dir.join("calc_metrics.json"), json);
                        }
                        metrics
                    });

                let result = match outcome {
                    Ok(metrics) => TuningResult { worker_id, config, metrics: Some(metrics) },
                    Err(e) => {
                        let _ = fs::write(target_dir.join("error_log.txt"), e.to_string());
                        TuningResult { worker_id, config, metrics: None }
                    }
                };
                let _ = result_tx.send(result);
            }
        }));
    }
    drop(result_tx);

    for handle in handles {
        let _ = handle.join();
    }

    Ok(result_rx.iter().collect())
}
