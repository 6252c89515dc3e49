//! Integration tests for the simulation and tuning engine.
//!
//! These exercise a full replay end to end: writing a synthetic
//! performance-log CSV to disk, loading it through `trace::load_from_dir`,
//! running a `Simulator` to completion, and checking the resulting
//! decisions and metrics.

use chrono::{Duration, NaiveDateTime};
use serde_json::{Map, Value};
use std::fs;
use tempfile::TempDir;
use vasim::config::Configuration;
use vasim::models::TIMESTAMP_FORMAT;
use vasim::tuning::{self, ParamSpace, Strategy};
use vasim::{metrics, trace, Simulator};

fn write_trace_csv(dir: &std::path::Path, cpu_values: &[f64]) {
    let start = NaiveDateTime::parse_from_str("2024.01.01-00:00:00:000000", TIMESTAMP_FORMAT).unwrap();
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(dir.join("perf_event_log.csv")).unwrap();
    writer.write_record(["TIMESTAMP", "CPU_USAGE_ACTUAL"]).unwrap();
    for (i, cpu) in cpu_values.iter().enumerate() {
        let time = start + Duration::minutes(i as i64);
        writer.write_record([time.format(TIMESTAMP_FORMAT).to_string(), cpu.to_string()]).unwrap();
    }
    writer.flush().unwrap();
}

fn sawtooth_cpu(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let phase = (i % 20) as f64;
            if phase < 10.0 { 5.0 + phase * 4.0 } else { 45.0 - (phase - 10.0) * 4.0 }
        })
        .collect()
}

fn additive_config() -> Configuration {
    let mut general = Map::new();
    general.insert("window".to_string(), Value::from(10));
    general.insert("lag".to_string(), Value::from(1));
    general.insert("max_cpu_limit".to_string(), Value::from(64));
    general.insert("min_cpu_limit".to_string(), Value::from(1));
    general.insert("recovery_time".to_string(), Value::from(5));
    let mut algo = Map::new();
    algo.insert("addend".to_string(), Value::from(5.0));
    Configuration::load_from_dict(general, algo, Map::new())
}

fn multiplicative_config() -> Configuration {
    let mut general = Map::new();
    general.insert("window".to_string(), Value::from(10));
    general.insert("lag".to_string(), Value::from(1));
    general.insert("max_cpu_limit".to_string(), Value::from(64));
    general.insert("min_cpu_limit".to_string(), Value::from(1));
    general.insert("recovery_time".to_string(), Value::from(5));
    let mut algo = Map::new();
    algo.insert("multiplier".to_string(), Value::from(1.3));
    algo.insert("smoothing_window".to_string(), Value::from(5));
    Configuration::load_from_dict(general, algo, Map::new())
}

#[test]
fn additive_recommender_replays_a_full_trace_and_scales() {
    let data_dir = TempDir::new().unwrap();
    write_trace_csv(data_dir.path(), &sawtooth_cpu(120));

    let trace = trace::load_from_dir(data_dir.path()).unwrap();
    let config = additive_config();
    let mut sim = Simulator::new(trace, &config, "additive", None).unwrap();
    sim.run();

    assert!(!sim.decisions().is_empty());
    assert!(sim.decisions().iter().any(|d| d.new_limit.is_some()));

    let run_metrics = metrics::calculate(sim.decisions(), sim.observations());
    assert!(run_metrics.sum_slack >= 0.0);
    assert!(run_metrics.sum_insufficient_cpu >= 0.0);
}

#[test]
fn multiplicative_recommender_replays_a_full_trace_and_scales() {
    let data_dir = TempDir::new().unwrap();
    write_trace_csv(data_dir.path(), &sawtooth_cpu(120));

    let trace = trace::load_from_dir(data_dir.path()).unwrap();
    let config = multiplicative_config();
    let mut sim = Simulator::new(trace, &config, "multiplicative", None).unwrap();
    sim.run();

    assert!(!sim.decisions().is_empty());

    let target_dir = TempDir::new().unwrap();
    sim.write_decisions_csv(&target_dir.path().join("decisions.csv")).unwrap();
    let contents = fs::read_to_string(target_dir.path().join("decisions.csv")).unwrap();
    assert!(contents.starts_with("LATEST_TIME,CURR_LIMIT,NEW_LIMIT"));
}

#[test]
fn grid_tuning_sweep_runs_every_combination_and_writes_worker_artifacts() {
    let data_dir = TempDir::new().unwrap();
    write_trace_csv(data_dir.path(), &sawtooth_cpu(90));
    let trace = trace::load_from_dir(data_dir.path()).unwrap();

    let base_config = additive_config();
    let mut params = ParamSpace::default();
    params.algo_specific.insert("addend".to_string(), vec![Value::from(1.0), Value::from(5.0), Value::from(10.0)]);
    params.general.insert("recovery_time".to_string(), vec![Value::from(0), Value::from(15)]);

    let results = tuning::run(&base_config, &params, Strategy::Grid, &trace, "additive", None, data_dir.path(), 3).unwrap();

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.metrics.is_some()));

    let mut tuning_dir = data_dir.path().as_os_str().to_os_string();
    tuning_dir.push("_tuning");
    let entries: Vec<_> = fs::read_dir(&tuning_dir).unwrap().filter_map(|e| e.ok()).collect();
    assert_eq!(entries.len(), 6);
    for entry in &entries {
        assert!(entry.path().join("decisions.csv").exists());
        assert!(entry.path().join("metadata.json").exists());
        assert!(entry.path().join("calc_metrics.json").exists());
    }
}

#[test]
fn tuning_sweep_rejects_a_parameter_not_present_in_the_base_config() {
    let data_dir = TempDir::new().unwrap();
    write_trace_csv(data_dir.path(), &sawtooth_cpu(30));
    let trace = trace::load_from_dir(data_dir.path()).unwrap();

    let base_config = additive_config();
    let mut params = ParamSpace::default();
    params.algo_specific.insert("not_a_real_knob".to_string(), vec![Value::from(1.0)]);

    let result = tuning::run(&base_config, &params, Strategy::Grid, &trace, "additive", None, data_dir.path(), 1);
    assert!(result.is_err());
}

#[test]
fn recovery_time_of_zero_allows_scaling_on_every_step() {
    let data_dir = TempDir::new().unwrap();
    write_trace_csv(data_dir.path(), &sawtooth_cpu(60));
    let trace = trace::load_from_dir(data_dir.path()).unwrap();

    let mut general = Map::new();
    general.insert("window".to_string(), Value::from(10));
    general.insert("lag".to_string(), Value::from(1));
    general.insert("max_cpu_limit".to_string(), Value::from(64));
    general.insert("min_cpu_limit".to_string(), Value::from(1));
    general.insert("recovery_time".to_string(), Value::from(0));
    let mut algo = Map::new();
    algo.insert("addend".to_string(), Value::from(5.0));
    let config = Configuration::load_from_dict(general, algo, Map::new());
    assert_eq!(config.recovery_time(), 0);

    let mut sim = Simulator::new(trace, &config, "additive", None).unwrap();
    sim.run();
    assert!(!sim.decisions().is_empty());
}
