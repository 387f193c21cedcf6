//! The scheduling loop composing sources, accumulation, checks and
//! notifications.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::data::{alerts, gps, AlertState, Reading, SeriesStore, StatusSnapshot, Thresholds};
use crate::notify::{Fact, StatusCard, WebhookNotifier};
use crate::probe::{system, CommandProbe, DockerProbe, InternetProbe, ServiceProbe};
use crate::source::{CountKind, DirCursor, Signal};

/// Subtitle of the shutdown card; the power controller raises the flag when
/// the battery can no longer carry the station.
const SHUTDOWN_SUBTITLE: &str = "Low battery";

/// One station's telemetry agent.
///
/// Owns all mutable state - cursors, accumulated series, alert booleans -
/// and drives it from a single thread. Three cadences nest inside one fast
/// tick: every tick checks the shutdown flag, every K ticks runs a
/// status-check, every M status-checks publishes a snapshot and notifies.
pub struct Agent {
    settings: Settings,
    thresholds: Thresholds,

    ais: DirCursor,
    gps: DirCursor,
    sensors: DirCursor,
    power: DirCursor,
    hydrophone: DirCursor,

    series: SeriesStore,
    alerts: AlertState,

    service_probe: Box<dyn ServiceProbe>,
    internet: Box<dyn InternetProbe>,
    notifier: Option<WebhookNotifier>,

    shutdown_seen: bool,
    ticks_since_status: u64,
    status_since_write: u64,
}

impl Agent {
    /// Build an agent with the default collaborators: docker service probe,
    /// external connectivity check, webhook delivery when configured.
    pub fn new(settings: Settings) -> Result<Self> {
        let service_probe = Box::new(DockerProbe::new(settings.service_prefix.clone()));
        let internet = Box::new(CommandProbe::new(&settings.internet_check));
        let notifier = if settings.webhook_url.is_empty() {
            None
        } else {
            Some(WebhookNotifier::new(
                settings.webhook_url.clone(),
                Some(settings.webhook_token.clone()),
            )?)
        };
        Ok(Self::with_probes(settings, service_probe, internet, notifier))
    }

    /// Build an agent with explicit collaborators.
    pub fn with_probes(
        settings: Settings,
        service_probe: Box<dyn ServiceProbe>,
        internet: Box<dyn InternetProbe>,
        notifier: Option<WebhookNotifier>,
    ) -> Self {
        Self {
            ais: DirCursor::new(settings.ais_dir(), CountKind::Lines),
            gps: DirCursor::new(settings.gps_dir(), CountKind::Lines),
            sensors: DirCursor::new(settings.sensors_dir(), CountKind::Lines),
            power: DirCursor::new(settings.power_dir(), CountKind::Lines),
            hydrophone: DirCursor::new(settings.hydrophone_dir(), CountKind::Bytes),
            thresholds: settings.thresholds.clone(),
            settings,
            series: SeriesStore::new(),
            alerts: AlertState::new(),
            service_probe,
            internet,
            notifier,
            shutdown_seen: false,
            ticks_since_status: 0,
            status_since_write: 0,
        }
    }

    /// Run ticks forever. Data and delivery failures are logged and
    /// absorbed; only process termination stops the loop.
    pub fn run(&mut self) {
        info!(
            base_dir = %self.settings.base_dir.display(),
            tick_secs = self.settings.tick_secs,
            "agent started"
        );
        loop {
            self.tick();
            thread::sleep(Duration::from_secs(self.settings.tick_secs.max(1)));
        }
    }

    /// One scheduler tick. Shutdown handling always runs first; cadence
    /// counters decide whether status-check and write work follow.
    pub fn tick(&mut self) {
        self.check_shutdown_signal();

        self.ticks_since_status += 1;
        if self.ticks_since_status < self.settings.ticks_per_status() {
            return;
        }
        self.ticks_since_status = 0;
        self.status_check(unix_ms());

        self.status_since_write += 1;
        if self.status_since_write < self.settings.status_checks_per_write {
            return;
        }
        self.status_since_write = 0;
        self.write_cycle(unix_secs());
    }

    /// Send the shutdown card when the flag file turns `true`, once per
    /// observed signal; the latch re-arms when the flag clears.
    fn check_shutdown_signal(&mut self) {
        let requested = fs::read_to_string(&self.settings.shutdown_signal)
            .map(|contents| contents.trim() == "true")
            .unwrap_or(false);

        if !requested {
            self.shutdown_seen = false;
            return;
        }
        if self.shutdown_seen {
            return;
        }
        self.shutdown_seen = true;

        info!("shutdown signaled, sending immediate notification");
        let facts: Vec<Fact> = self
            .series
            .latest()
            .map(|(name, reading)| Fact::new(name, reading.display_value()))
            .collect();
        let card = StatusCard::shutdown(
            &self.settings.hostname,
            &self.settings.location,
            SHUTDOWN_SUBTITLE,
            facts,
        );
        self.dispatch(&card);
    }

    /// Gather one cycle of readings and re-evaluate the checks.
    fn status_check(&mut self, timestamp_ms: u64) {
        // Connectivity.
        let online = self.internet.online();
        self.series.append("internet", Reading(json!(online), timestamp_ms));

        // Service health and versions.
        match self.service_probe.services() {
            Ok(services) => {
                let mut stopped = Vec::new();
                for service in services {
                    if !service.running {
                        stopped.push(service.name.clone());
                    }
                    self.series
                        .append(service.name, Reading(json!(service.version), timestamp_ms));
                }
                self.series.append(
                    "unhealthy_services",
                    Reading(json!(stopped.join(" ")), timestamp_ms),
                );
            }
            Err(err) => warn!(%err, "service probe unavailable"),
        }

        // Vessel detections: signal only, the records stay on disk.
        if self.ais.poll() == Signal::NewData {
            self.series
                .append("ais_record", Reading(json!(true), timestamp_ms));
        }

        // Audio recordings grow by bytes.
        if self.hydrophone.poll() == Signal::NewData {
            self.series
                .append("audio_record", Reading(json!(true), timestamp_ms));
        }

        // Upload queue depth.
        let pending = pending_uploads(&self.settings.upload_dir);
        if pending > 0 {
            self.series
                .append("files_to_upload", Reading(json!(pending), timestamp_ms));
        }

        // Power and ambient sensor records.
        self.power.poll();
        if let Some(path) = self.power.active_file() {
            self.series.ingest_records(path);
        }
        self.sensors.poll();
        if let Some(path) = self.sensors.active_file() {
            self.series.ingest_records(path);
        }

        // Navigation fixes.
        self.gps.poll();
        if let Some(path) = self.gps.active_file() {
            match fs::read_to_string(path) {
                Ok(text) => {
                    for (name, value) in gps::parse_fix(&text) {
                        self.series
                            .append(name, Reading(Value::String(value), timestamp_ms));
                    }
                }
                Err(err) => debug!(file = %path.display(), %err, "fix report unreadable"),
            }
        }

        // Host metrics.
        if let Some(load) = system::load_average_1m() {
            self.series
                .append("system_load", Reading(json!(load), timestamp_ms));
        }
        let memory_total_mb = system::memory().map(|m| {
            self.series.append(
                "memory_used_mb",
                Reading(json!(m.used_mb as u64), timestamp_ms),
            );
            m.total_mb
        });
        if let Some(free) = system::disk_free_gb(&self.settings.disk_path) {
            self.series
                .append("disk_free_gb", Reading(json!(free), timestamp_ms));
        }
        if let Some(uptime) = system::uptime_seconds() {
            self.series
                .append("uptime_seconds", Reading(json!(uptime), timestamp_ms));
        }

        alerts::evaluate(
            &self.series,
            memory_total_mb,
            &self.thresholds,
            &mut self.alerts,
        );
    }

    /// Close the accumulation window: snapshot, persist, notify.
    fn write_cycle(&mut self, timestamp_secs: u64) {
        let snapshot = self.series.snapshot(&self.alerts);

        match snapshot.write_staged(
            &self.settings.status_dir(),
            &self.settings.hostname,
            timestamp_secs,
        ) {
            Ok(path) => info!(path = %path.display(), "status snapshot published"),
            Err(err) => warn!(%err, "status snapshot not persisted"),
        }

        let card = StatusCard::status(
            &self.settings.hostname,
            &self.settings.location,
            &self.alerts,
            facts_from(&snapshot),
        );
        self.dispatch(&card);
    }

    /// Fire-and-forget delivery: one attempt, failures become log lines.
    fn dispatch(&self, card: &StatusCard) {
        let Some(notifier) = &self.notifier else {
            debug!(title = %card.title, "no webhook configured, dropping card");
            return;
        };
        match notifier.send(card) {
            Ok(status) => info!(status, "notification delivered"),
            Err(err) => warn!(%err, "notification delivery failed"),
        }
    }
}

/// One fact per metric with at least one reading this window.
fn facts_from(snapshot: &StatusSnapshot) -> Vec<Fact> {
    snapshot
        .metrics
        .iter()
        .map(|(name, reading)| Fact::new(name.clone(), reading.display_value()))
        .collect()
}

/// Plain files waiting in the upload queue. A missing queue directory is an
/// empty queue.
fn pending_uploads(dir: &Path) -> usize {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .count(),
        Err(_) => 0,
    }
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
