//! Agent settings.
//!
//! Settings resolve in three layers: built-in defaults (matching the
//! station image's conventional paths and the identity environment
//! variables), an optional settings file, and `STATIONWATCH_`-prefixed
//! environment variables.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::Thresholds;

/// Everything the agent needs to run on one host.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the telemetry tree; each source is a subdirectory.
    pub base_dir: PathBuf,
    /// Directory of files queued for archive upload.
    pub upload_dir: PathBuf,
    /// Flag file requesting the immediate shutdown notification.
    pub shutdown_signal: PathBuf,
    /// Filesystem whose free space feeds the disk check.
    pub disk_path: PathBuf,
    /// Station identity, used in card titles and snapshot filenames.
    pub hostname: String,
    pub location: String,
    /// Webhook endpoint; empty disables notifications.
    pub webhook_url: String,
    pub webhook_token: String,
    /// External connectivity check command.
    pub internet_check: PathBuf,
    /// Container name prefix identifying monitored services.
    pub service_prefix: String,
    /// Seconds between scheduler ticks.
    pub tick_secs: u64,
    /// Status-checks per snapshot write.
    pub status_checks_per_write: u64,
    pub thresholds: Thresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/flash/telemetry"),
            upload_dir: PathBuf::from("/flash/s3"),
            shutdown_signal: PathBuf::from("/var/run/shutdown.signal"),
            disk_path: PathBuf::from("/"),
            hostname: default_hostname(),
            location: env::var("LOCATION").unwrap_or_else(|_| "unknown".to_string()),
            webhook_url: env::var("WEBHOOK_URL").unwrap_or_default(),
            webhook_token: env::var("WEBHOOK_TOKEN").unwrap_or_default(),
            internet_check: PathBuf::from("/internet_check.sh"),
            service_prefix: "services_".to_string(),
            tick_secs: 6,
            status_checks_per_write: 5,
            thresholds: Thresholds::default(),
        }
    }
}

impl Settings {
    /// Load settings, layering an optional file and the environment over
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("STATIONWATCH"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn ais_dir(&self) -> PathBuf {
        self.base_dir.join("ais")
    }

    pub fn gps_dir(&self) -> PathBuf {
        self.base_dir.join("gps")
    }

    pub fn sensors_dir(&self) -> PathBuf {
        self.base_dir.join("sensors")
    }

    pub fn power_dir(&self) -> PathBuf {
        self.base_dir.join("power")
    }

    pub fn hydrophone_dir(&self) -> PathBuf {
        self.base_dir.join("hydrophone")
    }

    pub fn status_dir(&self) -> PathBuf {
        self.base_dir.join("status")
    }

    /// Ticks per status-check: the effective check interval is about one
    /// minute unless a single tick already exceeds that, in which case
    /// every tick checks.
    pub fn ticks_per_status(&self) -> u64 {
        (60 / self.tick_secs.max(1)).max(1)
    }
}

fn default_hostname() -> String {
    if let Ok(name) = env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    gethostname().unwrap_or_else(|| "station".to_string())
}

#[cfg(unix)]
fn gethostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: gethostname NUL-terminates within the buffer on success.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|b| *b == 0)?;
    String::from_utf8(buf[..end].to_vec()).ok()
}

#[cfg(not(unix))]
fn gethostname() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_directories_hang_off_base() {
        let settings = Settings {
            base_dir: PathBuf::from("/data/telemetry"),
            ..Settings::default()
        };
        assert_eq!(settings.ais_dir(), PathBuf::from("/data/telemetry/ais"));
        assert_eq!(
            settings.status_dir(),
            PathBuf::from("/data/telemetry/status")
        );
    }

    #[test]
    fn test_ticks_per_status() {
        let mut settings = Settings::default();

        settings.tick_secs = 6;
        assert_eq!(settings.ticks_per_status(), 10);

        // A tick slower than the check interval checks every tick.
        settings.tick_secs = 120;
        assert_eq!(settings.ticks_per_status(), 1);

        settings.tick_secs = 0;
        assert_eq!(settings.ticks_per_status(), 60);
    }
}
