//! Navigation-fix report parsing.
//!
//! The navigation producer appends plain-text fix reports rather than JSON
//! records. A report is a block of `label: value` lines; the subset below
//! feeds the status metrics, everything else is ignored.

/// Metrics extracted from a fix report, as `(series name, value)` pairs.
///
/// Values stay as trimmed strings - the producer mixes units into the text
/// (`"37.72 degrees"`, `"11.0 meters"`) and the status pipeline records
/// what it was given.
pub fn parse_fix(text: &str) -> Vec<(&'static str, String)> {
    let mut metrics = Vec::new();
    for line in text.lines() {
        if let Some(rest) = split_marker(line, "status:") {
            metrics.push(("gps_status", rest.trim().to_string()));
        } else if let Some(rest) = split_marker(line, "latitude:") {
            metrics.push(("latitude", strip_unit(rest, "degrees")));
        } else if let Some(rest) = split_marker(line, "longitude:") {
            metrics.push(("longitude", strip_unit(rest, "degrees")));
        } else if let Some(rest) = split_marker(line, "circular horizontal position uncertainty:") {
            metrics.push(("position_uncertainty_meters", strip_unit(rest, "meters")));
        } else if let Some(rest) = split_marker(line, "technology:") {
            metrics.push(("gps_technology", rest.trim().to_string()));
        } else if let Some(rest) = split_marker(line, "Satellites used:") {
            metrics.push(("gps_sats", rest.trim().to_string()));
        }
    }
    metrics
}

/// Text after the marker, if the line contains it anywhere.
fn split_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.split_once(marker).map(|(_, rest)| rest)
}

fn strip_unit(value: &str, unit: &str) -> String {
    value
        .split(unit)
        .next()
        .unwrap_or(value)
        .trim()
        .to_string()
}
