//! Config validation.
//!
//! Validation policy (spec §4.A): any missing or non-positive-integer scalar
//! in `general_config` fails *soft* — log a warning and substitute the
//! default — except `recovery_time`, which only gets a default when the
//! key is absent (zero is a legitimate "no cooldown" setting), and the
//! `min_cpu_limit <= max_cpu_limit` invariant, which resets both to
//! defaults. The prediction section is silently disabled unless `enabled`
//! is present and true, in which case its own scalars are soft-validated
//! the same way.

use super::{
    Configuration, DEFAULT_FORECASTING_MODEL, DEFAULT_FREQUENCY_MINUTES, DEFAULT_LAG,
    DEFAULT_MAX_CPU_LIMIT, DEFAULT_MINUTES_TO_PREDICT, DEFAULT_MIN_CPU_LIMIT,
    DEFAULT_RECOVERY_TIME, DEFAULT_TOTAL_PREDICTIVE_WINDOW, DEFAULT_WAITING_BEFORE_PREDICT,
    DEFAULT_WINDOW,
};
use serde_json::Value;

fn ensure_positive_int(config: &mut Configuration, key: &str, default: i64) {
    let valid = config
        .general_config
        .get(key)
        .and_then(Value::as_i64)
        .is_some_and(|v| v > 0);
    if !valid {
        log::warn!(
            "Invalid or missing '{}' in general_config. Using default value: {}",
            key,
            default
        );
        config
            .general_config
            .insert(key.to_string(), Value::from(default));
    }
}

/// Unlike `ensure_positive_int`, only fills in a default when the key is
/// entirely absent -- it does not second-guess a present value such as
/// `recovery_time: 0` (no cooldown at all), which is a legitimate setting.
fn ensure_present(config: &mut Configuration, key: &str, default: i64) {
    if !config.general_config.contains_key(key) {
        log::warn!("Missing key '{}' in general_config. Using default value: {}", key, default);
        config.general_config.insert(key.to_string(), Value::from(default));
    }
}

fn ensure_prediction_default(config: &mut Configuration, key: &str, default: Value) {
    if !config.prediction_config.contains_key(key) {
        log::warn!(
            "Missing key '{}' in prediction_config. Using default value: {}",
            key,
            default
        );
        config.prediction_config.insert(key.to_string(), default);
    }
}

/// Validate `config` in place, substituting defaults for invalid scalars.
pub fn validate(config: &mut Configuration) {
    ensure_positive_int(config, "window", DEFAULT_WINDOW);
    ensure_positive_int(config, "lag", DEFAULT_LAG);
    ensure_positive_int(config, "max_cpu_limit", DEFAULT_MAX_CPU_LIMIT);
    ensure_positive_int(config, "min_cpu_limit", DEFAULT_MIN_CPU_LIMIT);
    ensure_present(config, "recovery_time", DEFAULT_RECOVERY_TIME);

    let enabled = config
        .prediction_config
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if enabled {
        ensure_prediction_default(
            config,
            "waiting_before_predict",
            Value::from(DEFAULT_WAITING_BEFORE_PREDICT),
        );
        ensure_prediction_default(
            config,
            "frequency_minutes",
            Value::from(DEFAULT_FREQUENCY_MINUTES),
        );
        ensure_prediction_default(
            config,
            "forecasting_models",
            Value::from(DEFAULT_FORECASTING_MODEL),
        );
        ensure_prediction_default(
            config,
            "minutes_to_predict",
            Value::from(DEFAULT_MINUTES_TO_PREDICT),
        );
        ensure_prediction_default(
            config,
            "total_predictive_window",
            Value::from(DEFAULT_TOTAL_PREDICTIVE_WINDOW),
        );
    } else {
        config
            .prediction_config
            .insert("enabled".to_string(), Value::from(false));
    }

    // Invariant: min_cpu_limit <= max_cpu_limit. Violation resets BOTH to
    // defaults, unlike the soft per-scalar substitution above.
    let min = config.min_cpu_limit();
    let max = config.max_cpu_limit();
    if min > max {
        log::warn!(
            "min_cpu_limit ({}) is greater than max_cpu_limit ({}). Resetting both to defaults.",
            min,
            max
        );
        config
            .general_config
            .insert("min_cpu_limit".to_string(), Value::from(DEFAULT_MIN_CPU_LIMIT));
        config
            .general_config
            .insert("max_cpu_limit".to_string(), Value::from(DEFAULT_MAX_CPU_LIMIT));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn resets_both_limits_on_min_greater_than_max() {
        let mut general = Map::new();
        general.insert("min_cpu_limit".to_string(), Value::from(5));
        general.insert("max_cpu_limit".to_string(), Value::from(2));
        let config = Configuration::load_from_dict(general, Map::new(), Map::new());

        assert_eq!(config.min_cpu_limit(), DEFAULT_MIN_CPU_LIMIT);
        assert_eq!(config.max_cpu_limit(), DEFAULT_MAX_CPU_LIMIT);
    }

    #[test]
    fn substitutes_default_for_non_positive_scalar() {
        let mut general = Map::new();
        general.insert("window".to_string(), Value::from(-5));
        let config = Configuration::load_from_dict(general, Map::new(), Map::new());
        assert_eq!(config.window(), DEFAULT_WINDOW);
    }

    #[test]
    fn prediction_section_fills_defaults_when_enabled() {
        let mut prediction = Map::new();
        prediction.insert("enabled".to_string(), Value::from(true));
        let config = Configuration::load_from_dict(Map::new(), Map::new(), prediction);
        assert!(config.prediction_enabled());
        assert_eq!(
            config.prediction_config.get("waiting_before_predict").and_then(Value::as_i64),
            Some(DEFAULT_WAITING_BEFORE_PREDICT)
        );
    }

    #[test]
    fn prediction_section_disabled_silently_when_absent() {
        let config = Configuration::load_from_dict(Map::new(), Map::new(), Map::new());
        assert!(!config.prediction_enabled());
        assert!(!config.prediction_config.contains_key("waiting_before_predict"));
    }
}
