//! Command-line entry point: a single simulation run, or a parameter
//! sweep across many runs (spec §4.I).

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use vasim::tuning::{self, ParamSpace, Strategy};
use vasim::{config, metrics, Simulator};

#[derive(Parser)]
#[command(name = "vasim", about = "Vertical autoscaling simulator and parameter-tuning engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a trace through a single recommender/scaler configuration.
    Simulate {
        /// Directory containing the recorded performance-log CSVs.
        #[arg(long)]
        data_dir: PathBuf,
        /// Recommender algorithm: "additive" or "multiplicative".
        #[arg(long, default_value = "multiplicative")]
        algorithm: String,
        /// Path to the metadata.json config; defaults to `<data_dir>/metadata.json`.
        #[arg(long)]
        config_path: Option<PathBuf>,
        /// Initial enforced CPU limit; defaults to `general_config.max_cpu_limit`.
        #[arg(long)]
        initial_cpu_limit: Option<f64>,
    },
    /// Sweep a parameter space across many simulations in parallel.
    Tune {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        config_path: PathBuf,
        /// JSON file describing the parameter space, e.g.
        /// `{"algo_specific": {"addend": [1, 2, 3]}}`.
        #[arg(long)]
        params_path: PathBuf,
        #[arg(long, default_value = "multiplicative")]
        algorithm: String,
        #[arg(long, value_enum, default_value = "grid")]
        strategy: StrategyArg,
        /// Number of configurations to sample; only used by the random strategy.
        #[arg(long, default_value_t = 10)]
        num_combinations: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Worker thread count; defaults to the number of logical CPUs.
        #[arg(long)]
        num_workers: Option<usize>,
        #[arg(long)]
        initial_cpu_limit: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Grid,
    Random,
}

#[derive(serde::Deserialize, Default)]
struct ParamSpaceFile {
    #[serde(default)]
    general: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    algo_specific: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    prediction: BTreeMap<String, Vec<Value>>,
}

impl From<ParamSpaceFile> for ParamSpace {
    fn from(file: ParamSpaceFile) -> Self {
        ParamSpace { general: file.general, algo_specific: file.algo_specific, prediction: file.prediction }
    }
}

fn new_run_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("cfg-{}-{}", &hex[0..8], &hex[8..12])
}

fn run_simulate(
    data_dir: PathBuf,
    algorithm: String,
    config_path: Option<PathBuf>,
    initial_cpu_limit: Option<f64>,
) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(|| data_dir.join("metadata.json"));
    let config = config::load_from_file(&config_path)?;
    let trace = vasim::trace::load_from_dir(&data_dir)?;

    let mut simulation_root = data_dir.as_os_str().to_os_string();
    simulation_root.push("_simulations");
    let target_dir = Path::new(&simulation_root).join(format!("target_{}", new_run_id()));
    fs::create_dir_all(&target_dir)?;

    let (logger, _log_handle) = vasim::logging::SimulationLogger::spawn(&target_dir.join("InMemorySim.log"))?;
    logger.info(format!("starting simulation over {}", data_dir.display()));

    let mut sim = Simulator::new(trace, &config, &algorithm, initial_cpu_limit)?;
    sim.run();

    sim.write_decisions_csv(&target_dir.join("decisions.csv"))?;
    sim.flush_trace(&target_dir.join("perf_event_log.csv"))?;
    let run_metrics = metrics::calculate(sim.decisions(), sim.observations());
    fs::write(target_dir.join("calc_metrics.json"), serde_json::to_string_pretty(&run_metrics)?)?;
    config::to_file(&config, &target_dir.join("metadata.json"))?;

    logger.info(format!("simulation finished, wrote results to {}", target_dir.display()));
    println!("{}", serde_json::to_string_pretty(&run_metrics)?);
    println!("results written to {}", target_dir.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_tune(
    data_dir: PathBuf,
    config_path: PathBuf,
    params_path: PathBuf,
    algorithm: String,
    strategy: StrategyArg,
    num_combinations: usize,
    seed: Option<u64>,
    num_workers: Option<usize>,
    initial_cpu_limit: Option<f64>,
) -> anyhow::Result<()> {
    let base_config = config::load_from_file(&config_path)?;
    let trace = vasim::trace::load_from_dir(&data_dir)?;

    let params_json = fs::read_to_string(&params_path)?;
    let params_file: ParamSpaceFile = serde_json::from_str(&params_json)?;
    let params: ParamSpace = params_file.into();

    let strategy = match strategy {
        StrategyArg::Grid => Strategy::Grid,
        StrategyArg::Random => Strategy::Random {
            num_combinations,
            seed: seed.unwrap_or(tuning::DEFAULT_RANDOM_SEED),
        },
    };
    let num_workers = num_workers.unwrap_or_else(num_cpus::get);

    let results = tuning::run(
        &base_config,
        &params,
        strategy,
        &trace,
        &algorithm,
        initial_cpu_limit,
        &data_dir,
        num_workers,
    )?;

    let succeeded = results.iter().filter(|r| r.metrics.is_some()).count();
    println!("ran {} configurations, {} succeeded", results.len(), succeeded);
    for result in &results {
        match &result.metrics {
            Some(m) => println!("{}: sum_slack={:.2} num_scalings={}", result.worker_id, m.sum_slack, m.num_scalings),
            None => println!("{}: failed", result.worker_id),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate { data_dir, algorithm, config_path, initial_cpu_limit } => {
            run_simulate(data_dir, algorithm, config_path, initial_cpu_limit)
        }
        Command::Tune {
            data_dir,
            config_path,
            params_path,
            algorithm,
            strategy,
            num_combinations,
            seed,
            num_workers,
            initial_cpu_limit,
        } => run_tune(
            data_dir,
            config_path,
            params_path,
            algorithm,
            strategy,
            num_combinations,
            seed,
            num_workers,
            initial_cpu_limit,
        ),
    }
}
