//! Configuration module for the simulator and tuning orchestrator.
//!
//! A `Configuration` is a pure value object: three named sections
//! (`general_config`, `algo_specific_config`, `prediction_config`), each a
//! mapping from string to scalar or list, mirroring the on-disk metadata
//! JSON (§6 Metadata JSON). Recommenders read their own keys out of
//! `algo_specific_config`; the engine only interprets `general_config` and
//! `prediction_config`.
//!
//! # Module Structure
//!
//! - `loader`: load/save the JSON metadata file
//! - `validator`: soft validation with default substitution

pub mod loader;
pub mod validator;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default `window` in minutes.
pub const DEFAULT_WINDOW: i64 = 60;
/// Default `lag` in minutes.
pub const DEFAULT_LAG: i64 = 15;
/// Default `max_cpu_limit`.
pub const DEFAULT_MAX_CPU_LIMIT: i64 = 20;
/// Default `min_cpu_limit`.
pub const DEFAULT_MIN_CPU_LIMIT: i64 = 1;
/// Default `recovery_time` in minutes.
pub const DEFAULT_RECOVERY_TIME: i64 = 15;

/// Default prediction-section values, used only when `enabled: true`.
pub const DEFAULT_WAITING_BEFORE_PREDICT: i64 = 1440;
pub const DEFAULT_FREQUENCY_MINUTES: i64 = 1;
pub const DEFAULT_FORECASTING_MODEL: &str = "naive";
pub const DEFAULT_MINUTES_TO_PREDICT: i64 = 10;
pub const DEFAULT_TOTAL_PREDICTIVE_WINDOW: i64 = 60;

/// The three named configuration sections. Unknown keys round-trip
/// unmodified since each section is a raw JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub general_config: Map<String, Value>,
    #[serde(default)]
    pub algo_specific_config: Map<String, Value>,
    #[serde(default)]
    pub prediction_config: Map<String, Value>,
}

impl Configuration {
    /// Build a `Configuration` from already-parsed sections (the "load from
    /// dict" entry point), then validate it.
    pub fn load_from_dict(
        general_config: Map<String, Value>,
        algo_specific_config: Map<String, Value>,
        prediction_config: Map<String, Value>,
    ) -> Self {
        let mut config = Configuration {
            general_config,
            algo_specific_config,
            prediction_config,
        };
        config.validate();
        config
    }

    /// Read a positive-integer scalar out of `general_config`, logging a
    /// warning and substituting `default` if the key is missing or not a
    /// positive integer. Does not mutate `self`; callers that want the
    /// substitution persisted should call `validate()` first.
    fn positive_int(map: &Map<String, Value>, key: &str, default: i64) -> i64 {
        match map.get(key).and_then(Value::as_i64) {
            Some(v) if v > 0 => v,
            _ => default,
        }
    }

    pub fn window(&self) -> i64 {
        Self::positive_int(&self.general_config, "window", DEFAULT_WINDOW)
    }

    pub fn lag(&self) -> i64 {
        Self::positive_int(&self.general_config, "lag", DEFAULT_LAG)
    }

    pub fn max_cpu_limit(&self) -> i64 {
        Self::positive_int(&self.general_config, "max_cpu_limit", DEFAULT_MAX_CPU_LIMIT)
    }

    pub fn min_cpu_limit(&self) -> i64 {
        Self::positive_int(&self.general_config, "min_cpu_limit", DEFAULT_MIN_CPU_LIMIT)
    }

    /// Unlike the other scalars, `recovery_time` is allowed to be zero
    /// (no cooldown between scaling events) -- only a missing key falls
    /// back to the default.
    pub fn recovery_time(&self) -> i64 {
        self.general_config
            .get("recovery_time")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_RECOVERY_TIME)
    }

    pub fn prediction_enabled(&self) -> bool {
        self.prediction_config
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Read an f64 scalar out of `algo_specific_config`, falling back to
    /// `default` when the key is absent or not numeric.
    pub fn algo_f64(&self, key: &str, default: f64) -> f64 {
        self.algo_specific_config
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Read an integer scalar out of `algo_specific_config`, falling back to
    /// `fallback` (e.g. `general_config.window`) when absent.
    pub fn algo_i64(&self, key: &str, fallback: i64) -> i64 {
        self.algo_specific_config
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(fallback)
    }

    /// Validate in place: see `validator::validate`.
    pub fn validate(&mut self) {
        validator::validate(self);
    }
}

/// Load a configuration from a file, validating it on the way in.
pub fn load_from_file(path: &std::path::Path) -> Result<Configuration, ConfigError> {
    loader::load_config_from_file(path)
}

/// Persist a configuration to a file (post-validation effective config).
pub fn to_file(config: &Configuration, path: &std::path::Path) -> Result<(), ConfigError> {
    loader::save_config_to_file(config, path)
}
