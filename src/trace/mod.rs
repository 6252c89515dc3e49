//! Trace loading: ingest one or more performance-log CSVs into a
//! time-indexed, de-duplicated, sorted in-memory table (spec §4.B).

use crate::error::TraceError;
use crate::models::{Observation, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A finite ordered sequence of observations, indexed by time for O(log n)
/// range queries. Invariant: sorted, unique timestamps, non-empty.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    observations: Vec<Observation>,
}

impl Trace {
    /// Build a trace from unsorted, possibly duplicated observations.
    /// Duplicates at the same timestamp collapse to the last reading.
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        let mut by_time: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for obs in observations {
            by_time.insert(obs.time, obs.cpu);
        }
        let observations = by_time
            .into_iter()
            .map(|(time, cpu)| Observation { time, cpu })
            .collect();
        Trace { observations }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.observations.first().map(|o| o.time)
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.observations.last().map(|o| o.time)
    }

    /// Indices of observations whose time lies in `[from, to]` inclusive.
    fn range_indices(&self, from: NaiveDateTime, to: NaiveDateTime) -> std::ops::Range<usize> {
        let start = self.observations.partition_point(|o| o.time < from);
        let end = self.observations.partition_point(|o| o.time <= to);
        start..end
    }

    /// Observations with time in `[from, to]` inclusive on both ends.
    pub fn window(&self, from: NaiveDateTime, to: NaiveDateTime) -> &[Observation] {
        let range = self.range_indices(from, to);
        &self.observations[range]
    }

    /// Clamp every observation in `[from, to]` whose `cpu` exceeds `limit`
    /// down to `limit`, in place. Models a throttled workload: it cannot
    /// draw more CPU than its enforced limit.
    pub fn clamp_range(&mut self, from: NaiveDateTime, to: NaiveDateTime, limit: f64) {
        let range = self.range_indices(from, to);
        for obs in &mut self.observations[range] {
            if obs.cpu > limit {
                obs.cpu = limit;
            }
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Write the trace back to a CSV with header `TIMESTAMP,CPU_USAGE_ACTUAL`.
    pub fn write_csv(&self, path: &Path) -> Result<(), TraceError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_record(["TIMESTAMP", "CPU_USAGE_ACTUAL"])?;
        for obs in &self.observations {
            writer.write_record([obs.time.format(TIMESTAMP_FORMAT).to_string(), obs.cpu.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl From<csv::Error> for TraceError {
    fn from(e: csv::Error) -> Self {
        TraceError::IoError(std::io::Error::other(e))
    }
}

/// Enumerate regular files under `dir` recursively, retaining those whose
/// name stem ends with `perf_event_log` and whose suffix is `.csv`.
fn find_trace_files(dir: &Path) -> Result<Vec<PathBuf>, TraceError> {
    let mut files = Vec::new();

    fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), TraceError> {
        let entries = fs::read_dir(dir)?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                walk(&path, files)?;
            } else if path.is_file() {
                let stem_matches = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.ends_with("perf_event_log"));
                let ext_matches = path.extension().is_some_and(|e| e == "csv");
                if stem_matches && ext_matches {
                    files.push(path);
                }
            }
        }
        Ok(())
    }

    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

#[derive(Debug, serde::Deserialize)]
struct TraceRow {
    #[serde(rename = "TIMESTAMP")]
    timestamp: String,
    #[serde(rename = "CPU_USAGE_ACTUAL")]
    cpu_usage_actual: f64,
}

/// Load and parse every matching CSV under `dir` into a sorted,
/// de-duplicated trace. Fails with `NoTraceData` when zero matching files or
/// zero valid rows remain.
pub fn load_from_dir(dir: &Path) -> Result<Trace, TraceError> {
    let files = find_trace_files(dir)?;
    if files.is_empty() {
        return Err(TraceError::NoTraceData(dir.display().to_string()));
    }

    let mut observations = Vec::new();
    for file in &files {
        let mut reader = csv::Reader::from_path(file)?;
        for result in reader.deserialize::<TraceRow>() {
            match result {
                Ok(row) => match NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT) {
                    Ok(time) => observations.push(Observation {
                        time,
                        cpu: row.cpu_usage_actual,
                    }),
                    Err(e) => log::warn!("Skipping malformed row in {}: {}", file.display(), e),
                },
                Err(e) => log::warn!("Skipping malformed row in {}: {}", file.display(), e),
            }
        }
    }

    if observations.is_empty() {
        return Err(TraceError::NoTraceData(dir.display().to_string()));
    }

    Ok(Trace::from_observations(observations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, rows: &[(&str, &str)]) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        writeln!(f, "TIMESTAMP,CPU_USAGE_ACTUAL").unwrap();
        for (ts, cpu) in rows {
            writeln!(f, "{},{}", ts, cpu).unwrap();
        }
    }

    #[test]
    fn loads_and_sorts_dedupes() {
        let dir = TempDir::new().unwrap();
        write_csv(
            dir.path(),
            "a_perf_event_log.csv",
            &[
                ("2024.01.01-00:02:00:000000", "20"),
                ("2024.01.01-00:01:00:000000", "10"),
                ("2024.01.01-00:01:00:000000", "15"), // duplicate: last wins
            ],
        );

        let trace = load_from_dir(dir.path()).unwrap();
        assert_eq!(trace.len(), 2);
        let obs = trace.observations();
        assert_eq!(obs[0].cpu, 15.0);
        assert_eq!(obs[1].cpu, 20.0);
    }

    #[test]
    fn ignores_non_matching_csvs() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "other.csv", &[("2024.01.01-00:01:00:000000", "10")]);

        let result = load_from_dir(dir.path());
        assert!(matches!(result, Err(TraceError::NoTraceData(_))));
    }

    #[test]
    fn empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        let result = load_from_dir(dir.path());
        assert!(matches!(result, Err(TraceError::NoTraceData(_))));
    }

    #[test]
    fn clamp_range_only_affects_window_above_limit() {
        let mut trace = Trace::from_observations(vec![
            Observation {
                time: NaiveDateTime::parse_from_str("2024.01.01-00:00:00:000000", TIMESTAMP_FORMAT).unwrap(),
                cpu: 50.0,
            },
            Observation {
                time: NaiveDateTime::parse_from_str("2024.01.01-00:01:00:000000", TIMESTAMP_FORMAT).unwrap(),
                cpu: 5.0,
            },
        ]);
        let t0 = trace.observations()[0].time;
        let t1 = trace.observations()[1].time;
        trace.clamp_range(t0, t1, 10.0);
        assert_eq!(trace.observations()[0].cpu, 10.0);
        assert_eq!(trace.observations()[1].cpu, 5.0);
    }
}
