//! Threshold health checks over the latest accumulated readings.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::series::SeriesStore;

/// Thresholds for the alert checks.
///
/// The watch levels mark a degraded-but-healthy band: they never flip a
/// check to unhealthy, only log that the value is drifting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Battery charge percentage at or below which the battery alerts.
    pub battery_charge_floor: f64,
    /// Temperature band (degrees C) outside which the station alerts.
    pub temperature_low: f64,
    pub temperature_high: f64,
    /// 1-minute load average levels.
    pub load_watch: f64,
    pub load_critical: f64,
    /// Used/total memory ratio levels.
    pub memory_watch: f64,
    pub memory_critical: f64,
    /// Free disk space levels in GB (watch above critical).
    pub disk_watch_gb: f64,
    pub disk_critical_gb: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            battery_charge_floor: 20.0,
            temperature_low: 10.0,
            temperature_high: 65.0,
            load_watch: 1.0,
            load_critical: 2.0,
            memory_watch: 0.7,
            memory_critical: 0.9,
            disk_watch_gb: 10.0,
            disk_critical_gb: 2.0,
        }
    }
}

/// Sticky check-name -> unhealthy mapping.
///
/// A check absent from the map has never been evaluated; absence is not
/// equivalent to healthy. Entries persist across cycles until the check is
/// re-evaluated, at which point the boolean is overwritten in place.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    checks: BTreeMap<String, bool>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one check, replacing any prior outcome.
    pub fn set(&mut self, check: impl Into<String>, unhealthy: bool) {
        self.checks.insert(check.into(), unhealthy);
    }

    /// The last recorded outcome, or `None` if the check was never
    /// evaluated.
    pub fn get(&self, check: &str) -> Option<bool> {
        self.checks.get(check).copied()
    }

    /// Number of checks evaluated at least once.
    pub fn evaluated(&self) -> usize {
        self.checks.len()
    }

    /// Number of evaluated checks currently healthy.
    pub fn healthy(&self) -> usize {
        self.checks.values().filter(|unhealthy| !**unhealthy).count()
    }

    /// Names of the checks currently alerting, in name order.
    pub fn failing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, unhealthy)| **unhealthy)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Fraction of evaluated checks currently healthy. A state with no
    /// evaluated checks counts as fully healthy.
    pub fn health_ratio(&self) -> f64 {
        if self.checks.is_empty() {
            1.0
        } else {
            self.healthy() as f64 / self.evaluated() as f64
        }
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.checks
    }
}

/// Evaluate every check that has data this cycle, overwriting its entry in
/// `alerts`. Checks without data are left untouched.
///
/// `memory_total_mb` is ambient host context rather than an accumulated
/// metric: the memory check compares the accumulated `memory_used_mb`
/// reading against it.
pub fn evaluate(
    series: &SeriesStore,
    memory_total_mb: Option<f64>,
    thresholds: &Thresholds,
    alerts: &mut AlertState,
) {
    if let Some(online) = series.last("internet").and_then(|r| r.value().as_bool()) {
        alerts.set("internet", !online);
    }

    // The service probe records the names of non-running services as one
    // space-joined string; empty means every monitored service is running.
    if let Some(stopped) = last_str(series, "unhealthy_services") {
        alerts.set("healthy", !stopped.trim().is_empty());
    }

    if let Some(status) = last_str(series, "battery_status") {
        alerts.set(
            "battery_status",
            !matches!(status, "NORMAL" | "CHARGING_FROM_IN"),
        );
    }

    if let Some(charge) = last_number(series, "battery_charge") {
        alerts.set("battery_charge", charge <= thresholds.battery_charge_floor);
    }

    if let Some(temp) = last_number(series, "temperature_c") {
        alerts.set(
            "temperature_c",
            temp < thresholds.temperature_low || temp > thresholds.temperature_high,
        );
    }

    if let Some(status) = last_str(series, "gps_status") {
        alerts.set("gps_status", status != "success");
    }

    if let Some(load) = last_number(series, "system_load") {
        if load <= thresholds.load_critical && load > thresholds.load_watch {
            debug!(load, "system load in watch band");
        }
        alerts.set("system_load", load > thresholds.load_critical);
    }

    if let (Some(used), Some(total)) = (last_number(series, "memory_used_mb"), memory_total_mb) {
        if total > 0.0 {
            let ratio = used / total;
            if ratio <= thresholds.memory_critical && ratio > thresholds.memory_watch {
                debug!(ratio, "memory use in watch band");
            }
            alerts.set("memory_used_mb", ratio > thresholds.memory_critical);
        }
    }

    if let Some(free) = last_number(series, "disk_free_gb") {
        if free >= thresholds.disk_critical_gb && free < thresholds.disk_watch_gb {
            debug!(free, "free disk space in watch band");
        }
        alerts.set("disk_free_gb", free < thresholds.disk_critical_gb);
    }
}

fn last_str<'a>(series: &'a SeriesStore, metric: &str) -> Option<&'a str> {
    series.last(metric).and_then(|r| r.value().as_str())
}

/// Latest reading coerced to a number. Producers are not consistent about
/// numeric formatting, so numeric strings are accepted too.
fn last_number(series: &SeriesStore, metric: &str) -> Option<f64> {
    let value = series.last(metric)?.value();
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::series::Reading;
    use serde_json::json;

    fn store_with(metric: &str, value: Value) -> SeriesStore {
        let mut store = SeriesStore::new();
        store.append(metric, Reading(value, 100));
        store
    }

    fn evaluate_one(metric: &str, value: Value, alerts: &mut AlertState) {
        let store = store_with(metric, value);
        evaluate(&store, None, &Thresholds::default(), alerts);
    }

    #[test]
    fn test_temperature_sequence() {
        let mut alerts = AlertState::new();

        evaluate_one("temperature_c", json!(5.0), &mut alerts);
        assert_eq!(alerts.get("temperature_c"), Some(true));

        evaluate_one("temperature_c", json!(40.0), &mut alerts);
        assert_eq!(alerts.get("temperature_c"), Some(false));

        evaluate_one("temperature_c", json!(80.0), &mut alerts);
        assert_eq!(alerts.get("temperature_c"), Some(true));
    }

    #[test]
    fn test_disk_free_bands() {
        let mut alerts = AlertState::new();

        evaluate_one("disk_free_gb", json!(1.5), &mut alerts);
        assert_eq!(alerts.get("disk_free_gb"), Some(true));

        evaluate_one("disk_free_gb", json!(5.0), &mut alerts);
        assert_eq!(alerts.get("disk_free_gb"), Some(false));

        evaluate_one("disk_free_gb", json!(15.0), &mut alerts);
        assert_eq!(alerts.get("disk_free_gb"), Some(false));
    }

    #[test]
    fn test_battery_checks() {
        let mut alerts = AlertState::new();

        evaluate_one("battery_status", json!("NORMAL"), &mut alerts);
        assert_eq!(alerts.get("battery_status"), Some(false));
        evaluate_one("battery_status", json!("CHARGING_FROM_IN"), &mut alerts);
        assert_eq!(alerts.get("battery_status"), Some(false));
        evaluate_one("battery_status", json!("NOT_PRESENT"), &mut alerts);
        assert_eq!(alerts.get("battery_status"), Some(true));

        // Charge arrives as a numeric string from the power producer.
        evaluate_one("battery_charge", json!("19"), &mut alerts);
        assert_eq!(alerts.get("battery_charge"), Some(true));
        evaluate_one("battery_charge", json!(20), &mut alerts);
        assert_eq!(alerts.get("battery_charge"), Some(true));
        evaluate_one("battery_charge", json!(21), &mut alerts);
        assert_eq!(alerts.get("battery_charge"), Some(false));
    }

    #[test]
    fn test_load_and_memory() {
        let mut alerts = AlertState::new();

        evaluate_one("system_load", json!(0.4), &mut alerts);
        assert_eq!(alerts.get("system_load"), Some(false));
        evaluate_one("system_load", json!(1.5), &mut alerts);
        assert_eq!(alerts.get("system_load"), Some(false));
        evaluate_one("system_load", json!(2.5), &mut alerts);
        assert_eq!(alerts.get("system_load"), Some(true));

        let store = store_with("memory_used_mb", json!(950));
        evaluate(&store, Some(1000.0), &Thresholds::default(), &mut alerts);
        assert_eq!(alerts.get("memory_used_mb"), Some(true));

        let store = store_with("memory_used_mb", json!(800));
        evaluate(&store, Some(1000.0), &Thresholds::default(), &mut alerts);
        assert_eq!(alerts.get("memory_used_mb"), Some(false));

        // Without the total there is no ratio to judge.
        let store = store_with("memory_used_mb", json!(999));
        evaluate(&store, None, &Thresholds::default(), &mut alerts);
        assert_eq!(alerts.get("memory_used_mb"), Some(false));
    }

    #[test]
    fn test_internet_and_services() {
        let mut alerts = AlertState::new();

        evaluate_one("internet", json!(false), &mut alerts);
        assert_eq!(alerts.get("internet"), Some(true));
        evaluate_one("internet", json!(true), &mut alerts);
        assert_eq!(alerts.get("internet"), Some(false));

        evaluate_one("unhealthy_services", json!(""), &mut alerts);
        assert_eq!(alerts.get("healthy"), Some(false));
        evaluate_one("unhealthy_services", json!("power gps"), &mut alerts);
        assert_eq!(alerts.get("healthy"), Some(true));
    }

    #[test]
    fn test_gps_status() {
        let mut alerts = AlertState::new();

        evaluate_one("gps_status", json!("success"), &mut alerts);
        assert_eq!(alerts.get("gps_status"), Some(false));
        evaluate_one("gps_status", json!("no fix"), &mut alerts);
        assert_eq!(alerts.get("gps_status"), Some(true));
    }

    #[test]
    fn test_missing_data_leaves_prior_state() {
        let mut alerts = AlertState::new();
        evaluate_one("temperature_c", json!(5.0), &mut alerts);
        assert_eq!(alerts.get("temperature_c"), Some(true));

        // An empty window must not clear the sticky outcome.
        let empty = SeriesStore::new();
        evaluate(&empty, None, &Thresholds::default(), &mut alerts);
        assert_eq!(alerts.get("temperature_c"), Some(true));
        assert_eq!(alerts.evaluated(), 1);
    }

    #[test]
    fn test_never_evaluated_is_absent() {
        let alerts = AlertState::new();
        assert_eq!(alerts.get("internet"), None);
        assert_eq!(alerts.evaluated(), 0);
        assert!((alerts.health_ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_health_ratio() {
        let mut alerts = AlertState::new();
        alerts.set("internet", false);
        alerts.set("healthy", false);
        alerts.set("temperature_c", false);
        alerts.set("disk_free_gb", true);

        assert_eq!(alerts.evaluated(), 4);
        assert_eq!(alerts.healthy(), 3);
        assert_eq!(alerts.failing(), vec!["disk_free_gb"]);
        assert!((alerts.health_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
