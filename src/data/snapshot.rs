//! The published status snapshot and its staged persistence.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::series::Reading;

/// Immutable flattened view of one write window: latest reading per metric
/// plus a copy of the alert state at snapshot time.
///
/// Serializes to the status wire format consumed downstream - metric names
/// at the top level, each mapping to its `[value, timestamp_ms]` pair, with
/// the alert booleans nested under `"alerts"`:
///
/// ```json
/// {"temperature_c": [21.5, 1690000000000], "alerts": {"internet": false}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub metrics: BTreeMap<String, Reading>,
    pub alerts: BTreeMap<String, bool>,
}

impl StatusSnapshot {
    /// Write the snapshot into `status_dir` using the staged-publish
    /// convention: the JSON lands under a leading-dot name, then every
    /// staged file in the directory is renamed to its plain name, so a
    /// reader never observes a partial snapshot.
    ///
    /// Returns the published path.
    pub fn write_staged(
        &self,
        status_dir: &Path,
        hostname: &str,
        timestamp_secs: u64,
    ) -> io::Result<PathBuf> {
        fs::create_dir_all(status_dir)?;

        let name = format!("status-{}-{}.json", hostname, timestamp_secs);
        let staged = status_dir.join(format!(".{}", name));
        let body = serde_json::to_string(self)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(&staged, body)?;

        publish_staged(status_dir)?;
        Ok(status_dir.join(name))
    }
}

/// Rename every staged (leading-dot) file in `dir` to its plain name.
pub fn publish_staged(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(dir = %dir.display(), %err, "skipping unreadable entry");
                continue;
            }
        };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if let Some(plain) = name.strip_prefix('.') {
            fs::rename(entry.path(), dir.join(plain))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> StatusSnapshot {
        let mut metrics = BTreeMap::new();
        metrics.insert("temperature_c".to_string(), Reading(json!(21.5), 100));
        metrics.insert(
            "battery_status".to_string(),
            Reading(json!("NORMAL"), 100),
        );
        let mut alerts = BTreeMap::new();
        alerts.insert("internet".to_string(), false);
        alerts.insert("temperature_c".to_string(), false);
        StatusSnapshot { metrics, alerts }
    }

    #[test]
    fn test_wire_format_is_flat() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["temperature_c"], json!([21.5, 100]));
        assert_eq!(value["battery_status"], json!(["NORMAL", 100]));
        assert_eq!(value["alerts"]["internet"], json!(false));
    }

    #[test]
    fn test_roundtrip() {
        let json = serde_json::to_string(&sample()).unwrap();
        let parsed: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.metrics.len(), 2);
        assert_eq!(parsed.metrics.get("temperature_c").unwrap().value(), &json!(21.5));
        assert_eq!(parsed.alerts.get("internet"), Some(&false));
    }

    #[test]
    fn test_write_staged_publishes_atomically() {
        let dir = tempdir().unwrap();
        let status_dir = dir.path().join("status");

        let published = sample()
            .write_staged(&status_dir, "station-7", 1690000000)
            .unwrap();
        assert_eq!(
            published.file_name().unwrap(),
            "status-station-7-1690000000.json"
        );
        assert!(published.exists());

        // No staged file may remain after publication.
        let dotfiles: Vec<_> = fs::read_dir(&status_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(dotfiles.is_empty());

        let body = fs::read_to_string(&published).unwrap();
        let parsed: StatusSnapshot = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.metrics.len(), 2);
    }
}
