//! Metrics calculator (spec §4.G): aligns the decision log against the
//! (possibly clamped) observation trace on a 1-minute grid and aggregates
//! slack/insufficient-CPU statistics for a finished simulation.
//!
//! Alignment floors every timestamp to the minute, keeps the latest value
//! per minute, then forward-fills gaps -- the same resampling a decision
//! or a performance reading would see if it only changed occasionally.

use crate::models::{Decision, MetricsRecord, Observation};
use chrono::{Duration, NaiveDateTime, Timelike};
use std::collections::BTreeMap;

fn floor_to_minute(time: NaiveDateTime) -> NaiveDateTime {
    time.with_second(0).unwrap().with_nanosecond(0).unwrap()
}

/// Floor every (time, value) pair to the minute, keeping the last value
/// seen in a given minute, then forward-fill every minute between the
/// first and last entry.
fn resample_1min(mut points: Vec<(NaiveDateTime, f64)>) -> Vec<(NaiveDateTime, f64)> {
    if points.is_empty() {
        return Vec::new();
    }
    points.sort_by_key(|(t, _)| *t);

    let mut floored: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for (time, value) in points {
        floored.insert(floor_to_minute(time), value);
    }

    let start = *floored.keys().next().unwrap();
    let end = *floored.keys().next_back().unwrap();

    let mut resampled = Vec::new();
    let mut current = start;
    let mut last_value = floored[&start];
    while current <= end {
        if let Some(v) = floored.get(&current) {
            last_value = *v;
        }
        resampled.push((current, last_value));
        current += Duration::minutes(1);
    }
    resampled
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len().is_multiple_of(2) {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Compute aggregate metrics for a finished run. An empty decision log
/// yields a zeroed `MetricsRecord`, not an error -- a run that never made
/// a single decision still produced valid (trivial) metrics.
pub fn calculate(decisions: &[Decision], observations: &[Observation]) -> MetricsRecord {
    if decisions.is_empty() {
        return MetricsRecord::default();
    }

    let decision_points: Vec<(NaiveDateTime, f64)> =
        decisions.iter().map(|d| (d.latest_time, d.curr_limit)).collect();
    let observation_points: Vec<(NaiveDateTime, f64)> =
        observations.iter().map(|o| (o.time, o.cpu)).collect();

    let decisions_resampled = resample_1min(decision_points);
    if observation_points.is_empty() {
        return MetricsRecord::default();
    }
    let observations_resampled: BTreeMap<NaiveDateTime, f64> =
        resample_1min(observation_points).into_iter().collect();

    let mut slacks = Vec::new();
    let mut insufficients = Vec::new();
    let mut sum_limits = 0.0;

    for &(time, curr_limit) in &decisions_resampled {
        let Some(&cpu) = observations_resampled.get(&time) else {
            continue;
        };
        let slack = (curr_limit - cpu).max(0.0);
        let insufficient = (cpu - curr_limit).max(0.0);
        slacks.push(slack);
        insufficients.push(insufficient);
        sum_limits += curr_limit;
    }

    if slacks.is_empty() {
        return MetricsRecord::default();
    }

    let num_scalings = decisions_resampled
        .windows(2)
        .filter(|pair| (pair[0].1 - pair[1].1).abs() > f64::EPSILON)
        .count() as u64;

    let num_insufficient_cpu = insufficients.iter().filter(|v| **v > 0.0).count() as u64;
    let n = slacks.len() as f64;
    let sum_slack: f64 = slacks.iter().sum();
    let sum_insufficient_cpu: f64 = insufficients.iter().sum();
    let max_slack = slacks.iter().cloned().fold(f64::MIN, f64::max);

    MetricsRecord {
        average_slack: sum_slack / n,
        average_insufficient_cpu: sum_insufficient_cpu / n,
        sum_slack,
        sum_insufficient_cpu,
        num_scalings,
        num_insufficient_cpu,
        insufficient_observations_percentage: num_insufficient_cpu as f64 / n * 100.0,
        slack_percentage: if sum_limits != 0.0 { sum_slack / sum_limits * 100.0 } else { 0.0 },
        median_insufficient_cpu: median(insufficients),
        median_slack: median(slacks),
        max_slack,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TIMESTAMP_FORMAT;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn empty_decisions_yield_default_metrics() {
        let metrics = calculate(&[], &[]);
        assert_eq!(metrics, MetricsRecord::default());
    }

    #[test]
    fn computes_slack_and_insufficient_from_aligned_series() {
        let decisions = vec![
            Decision { latest_time: ts("2024.01.01-00:00:00:000000"), curr_limit: 10.0, new_limit: None },
            Decision { latest_time: ts("2024.01.01-00:01:00:000000"), curr_limit: 10.0, new_limit: Some(20.0) },
            Decision { latest_time: ts("2024.01.01-00:02:00:000000"), curr_limit: 20.0, new_limit: None },
        ];
        let observations = vec![
            Observation { time: ts("2024.01.01-00:00:00:000000"), cpu: 4.0 },
            Observation { time: ts("2024.01.01-00:01:00:000000"), cpu: 15.0 },
            Observation { time: ts("2024.01.01-00:02:00:000000"), cpu: 5.0 },
        ];

        let metrics = calculate(&decisions, &observations);
        // minute 0: limit 10, cpu 4 -> slack 6, insufficient 0
        // minute 1: limit 10, cpu 15 -> slack 0, insufficient 5
        // minute 2: limit 20, cpu 5 -> slack 15, insufficient 0
        assert_eq!(metrics.sum_slack, 21.0);
        assert_eq!(metrics.sum_insufficient_cpu, 5.0);
        assert_eq!(metrics.num_insufficient_cpu, 1);
        assert_eq!(metrics.num_scalings, 1); // one transition: 10 -> 20
        assert_eq!(metrics.max_slack, 15.0);
    }

    #[test]
    fn missing_observation_for_a_decision_minute_is_skipped() {
        let decisions = vec![
            Decision { latest_time: ts("2024.01.01-00:00:00:000000"), curr_limit: 10.0, new_limit: None },
            Decision { latest_time: ts("2024.01.01-00:05:00:000000"), curr_limit: 10.0, new_limit: None },
        ];
        let observations = vec![Observation { time: ts("2024.01.01-00:00:00:000000"), cpu: 4.0 }];

        let metrics = calculate(&decisions, &observations);
        // Only minute 0 has a matching observation; minutes 1-5 are
        // forward-filled on the decision side but have no observation at
        // all, so they contribute nothing.
        assert_eq!(metrics.sum_slack, 6.0);
    }
}
