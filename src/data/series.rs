//! Per-cycle metric accumulation.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::alerts::AlertState;
use super::snapshot::StatusSnapshot;

/// One observation: a value and the producer's millisecond timestamp.
///
/// Serializes as the `[value, timestamp_ms]` pair used throughout the
/// telemetry wire formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading(pub Value, pub u64);

impl Reading {
    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.1
    }

    /// The value rendered for a notification fact.
    pub fn display_value(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A record as producers batch it: many datapoints per target per write.
#[derive(Debug, Deserialize)]
struct LineRecord {
    target: String,
    datapoints: Vec<Reading>,
}

/// Accumulates named metric series over one write window.
///
/// Series are created on first use, only ever appended to, and cleared as a
/// whole by [`snapshot`](SeriesStore::snapshot). One instance is owned by
/// the running agent; nothing else mutates it.
#[derive(Debug, Default)]
pub struct SeriesStore {
    series: BTreeMap<String, Vec<Reading>>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading to the named series, creating it on first use.
    pub fn append(&mut self, metric: impl Into<String>, reading: Reading) {
        self.series.entry(metric.into()).or_default().push(reading);
    }

    /// Latest reading of the named series, if any was recorded this window.
    pub fn last(&self, metric: &str) -> Option<&Reading> {
        self.series.get(metric).and_then(|readings| readings.last())
    }

    /// Number of series with at least one reading.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Latest reading per series, in name order.
    pub fn latest(&self) -> impl Iterator<Item = (&str, &Reading)> {
        self.series
            .iter()
            .filter_map(|(name, readings)| readings.last().map(|r| (name.as_str(), r)))
    }

    /// Ingest newline-delimited JSON records of the form
    /// `{"target": ..., "datapoints": [[value, ts], ...]}`.
    ///
    /// Producers batch many datapoints per record; only the last one matters
    /// for status purposes, so only it is appended. Malformed lines are
    /// skipped. Returns the number of readings ingested.
    pub fn ingest_records(&mut self, path: &Path) -> usize {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) => {
                warn!(file = %path.display(), %err, "record file unreadable");
                return 0;
            }
        };

        let mut ingested = 0;
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    debug!(file = %path.display(), %err, "stopping at unreadable line");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let record: LineRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(err) => {
                    debug!(file = %path.display(), %err, "skipping malformed record");
                    continue;
                }
            };
            if let Some(reading) = record.datapoints.into_iter().last() {
                self.append(record.target, reading);
                ingested += 1;
            }
        }
        ingested
    }

    /// Flatten every series to its latest reading, merge in a copy of the
    /// current alert state, and clear the accumulation window.
    ///
    /// This is the only operation that clears accumulated state; the caller
    /// invokes it at most once per write cadence.
    pub fn snapshot(&mut self, alerts: &AlertState) -> StatusSnapshot {
        let metrics = self
            .series
            .iter()
            .filter_map(|(name, readings)| {
                readings.last().map(|r| (name.clone(), r.clone()))
            })
            .collect();
        self.series.clear();
        StatusSnapshot {
            metrics,
            alerts: alerts.as_map().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_append_and_last() {
        let mut store = SeriesStore::new();
        store.append("temperature_c", Reading(json!(21.5), 100));
        store.append("temperature_c", Reading(json!(22.0), 200));

        let last = store.last("temperature_c").unwrap();
        assert_eq!(last.value(), &json!(22.0));
        assert_eq!(last.timestamp_ms(), 200);
        assert!(store.last("humidity").is_none());
    }

    #[test]
    fn test_snapshot_returns_last_values_and_clears() {
        let mut store = SeriesStore::new();
        store.append("temperature_c", Reading(json!(21.5), 100));
        store.append("temperature_c", Reading(json!(22.0), 200));
        store.append("battery_charge", Reading(json!(87), 200));

        let snapshot = store.snapshot(&AlertState::default());
        assert_eq!(snapshot.metrics.len(), 2);
        assert_eq!(
            snapshot.metrics.get("temperature_c").unwrap().value(),
            &json!(22.0)
        );
        assert!(store.is_empty());

        // Values recorded after the snapshot never appear in it.
        store.append("temperature_c", Reading(json!(30.0), 300));
        assert_eq!(snapshot.metrics.len(), 2);
        assert_eq!(
            snapshot.metrics.get("temperature_c").unwrap().value(),
            &json!(22.0)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ingest_keeps_only_last_datapoint() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"target": "temperature_c", "datapoints": [[20.1, 100], [20.7, 200], [21.3, 300]]}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"target": "humidity", "datapoints": [[55.0, 300]]}}"#
        )
        .unwrap();

        let mut store = SeriesStore::new();
        assert_eq!(store.ingest_records(file.path()), 2);

        let temp = store.last("temperature_c").unwrap();
        assert_eq!(temp.value(), &json!(21.3));
        assert_eq!(temp.timestamp_ms(), 300);
        assert_eq!(store.last("humidity").unwrap().value(), &json!(55.0));
    }

    #[test]
    fn test_ingest_skips_malformed_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(file, r#"{{"target": "pressure"}}"#).unwrap();
        writeln!(
            file,
            r#"{{"target": "pressure", "datapoints": [[1013.2, 400]]}}"#
        )
        .unwrap();

        let mut store = SeriesStore::new();
        assert_eq!(store.ingest_records(file.path()), 1);
        assert_eq!(store.last("pressure").unwrap().value(), &json!(1013.2));
    }

    #[test]
    fn test_ingest_missing_file_is_not_fatal() {
        let mut store = SeriesStore::new();
        assert_eq!(store.ingest_records(Path::new("/nonexistent/records.json")), 0);
        assert!(store.is_empty());
    }
}
