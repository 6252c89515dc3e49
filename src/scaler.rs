//! Infra scaler: turns a recommender's proposed limit into an actually
//! enforced one, subject to cooldown and min/max clamping (spec §4.E).
//!
//! Real infrastructure takes time to provision and warm up after a scaling
//! event, so the scaler enforces a recovery window during which further
//! scaling requests are simply dropped.

use crate::config::Configuration;
use crate::provider::ClusterStateProvider;
use chrono::NaiveDateTime;

pub struct InfraScaler {
    recovery_time_minutes: i64,
    min_cpu_limit: f64,
    max_cpu_limit: f64,
    last_scaling_time: Option<NaiveDateTime>,
}

impl InfraScaler {
    pub fn new(config: &Configuration) -> Self {
        InfraScaler {
            recovery_time_minutes: config.recovery_time(),
            min_cpu_limit: config.min_cpu_limit() as f64,
            max_cpu_limit: config.max_cpu_limit() as f64,
            last_scaling_time: None,
        }
    }

    /// Attempt to scale `provider` to `new_limit` at `time_now`. A no-op
    /// if `new_limit` matches the currently enforced limit. Otherwise,
    /// scales only once the recovery window since the last *accepted*
    /// scale has strictly elapsed, clamping the requested limit to
    /// `[min_cpu_limit, max_cpu_limit]`. Returns whether the scale took
    /// effect.
    pub fn scale(&mut self, provider: &mut ClusterStateProvider, new_limit: f64, time_now: NaiveDateTime) -> bool {
        let current = provider.get_current_cpu_limit();
        if (new_limit - current).abs() <= f64::EPSILON {
            return false;
        }

        let cooldown_elapsed = match self.last_scaling_time {
            None => true,
            Some(last) => (time_now - last).num_seconds() > self.recovery_time_minutes * 60,
        };
        if !cooldown_elapsed {
            return false;
        }

        // An if/else-if ladder, not `.clamp()`: clamp() panics when
        // min > max, which this layer never guarantees on its own.
        let clamped = if new_limit < self.min_cpu_limit {
            self.min_cpu_limit
        } else if new_limit > self.max_cpu_limit {
            self.max_cpu_limit
        } else {
            new_limit
        };
        provider.set_cpu_limit(clamped);
        self.last_scaling_time = Some(time_now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TIMESTAMP_FORMAT;
    use crate::trace::Trace;
    use crate::models::Observation;
    use serde_json::{Map, Value};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn config(min: i64, max: i64, recovery_time: i64) -> Configuration {
        let mut general = Map::new();
        general.insert("min_cpu_limit".to_string(), Value::from(min));
        general.insert("max_cpu_limit".to_string(), Value::from(max));
        general.insert("recovery_time".to_string(), Value::from(recovery_time));
        Configuration::load_from_dict(general, Map::new(), Map::new())
    }

    fn provider(cfg: &Configuration, initial: f64) -> ClusterStateProvider {
        let trace = Trace::from_observations(vec![
            Observation { time: ts("2024.01.01-00:00:00:000000"), cpu: 5.0 },
            Observation { time: ts("2024.01.01-01:00:00:000000"), cpu: 5.0 },
        ]);
        ClusterStateProvider::new(trace, cfg, Some(initial)).unwrap()
    }

    #[test]
    fn noop_when_new_limit_equals_current() {
        let cfg = config(1, 20, 15);
        let mut scaler = InfraScaler::new(&cfg);
        let mut p = provider(&cfg, 10.0);
        assert!(!scaler.scale(&mut p, 10.0, ts("2024.01.01-00:00:00:000000")));
        assert_eq!(p.get_current_cpu_limit(), 10.0);
    }

    #[test]
    fn clamps_to_min_and_max() {
        let cfg = config(2, 8, 0);
        let mut scaler = InfraScaler::new(&cfg);
        let mut p = provider(&cfg, 5.0);

        assert!(scaler.scale(&mut p, 20.0, ts("2024.01.01-00:00:00:000000")));
        assert_eq!(p.get_current_cpu_limit(), 8.0);

        assert!(scaler.scale(&mut p, 1.0, ts("2024.01.01-00:01:00:000000")));
        assert_eq!(p.get_current_cpu_limit(), 2.0);
    }

    #[test]
    fn blocks_scaling_inside_cooldown_then_allows_after() {
        let cfg = config(1, 20, 10); // 10 minute recovery
        let mut scaler = InfraScaler::new(&cfg);
        let mut p = provider(&cfg, 5.0);

        assert!(scaler.scale(&mut p, 10.0, ts("2024.01.01-00:00:00:000000")));
        // exactly at the boundary: not strictly greater than recovery_time * 60 seconds
        assert!(!scaler.scale(&mut p, 12.0, ts("2024.01.01-00:10:00:000000")));
        assert_eq!(p.get_current_cpu_limit(), 10.0);
        // one second past the boundary: cooldown has elapsed
        assert!(scaler.scale(&mut p, 12.0, ts("2024.01.01-00:10:01:000000")));
        assert_eq!(p.get_current_cpu_limit(), 12.0);
    }
}
