//! # stationwatch
//!
//! Telemetry aggregation and health alerting agent for off-grid monitoring
//! stations.
//!
//! A station's producers (detection receiver, navigation unit, power
//! controller, ambient sensors, recorder, uploader) each write append-only
//! files into their own directory. This crate watches those directories,
//! rolls fresh readings into periodic status snapshots, evaluates threshold
//! health checks, and best-effort delivers status and shutdown cards to a
//! webhook.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent (one thread)                  │
//! │                                                              │
//! │  tick ──▶ shutdown flag ──▶ notify (immediate)               │
//! │    │                                                         │
//! │    ├─ every K ticks ─▶ probes ─┐                             │
//! │    │                  cursors ─┼▶ SeriesStore ─▶ AlertState  │
//! │    │                           │   (append)      (evaluate)  │
//! │    └─ every M checks ──────────┴▶ snapshot ─▶ status dir     │
//! │                                      │                       │
//! │                                      └──────▶ webhook        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: incremental change detection over append-only
//!   directories ([`DirCursor`]), honoring the staged-publish convention
//! - **[`data`]**: accumulation ([`SeriesStore`]), health rules
//!   ([`Thresholds`], [`AlertState`]) and the published [`StatusSnapshot`]
//! - **[`probe`]**: collaborator seams - service health/versions,
//!   connectivity, host metrics
//! - **[`notify`]**: message cards and their fire-and-forget delivery
//! - **[`agent`]**: the multi-cadence loop tying it together
//!
//! ## Usage
//!
//! ```no_run
//! use stationwatch::{Agent, Settings};
//!
//! let settings = Settings::default();
//! let mut agent = Agent::new(settings).expect("agent setup");
//! agent.run();
//! ```

pub mod agent;
pub mod config;
pub mod data;
pub mod notify;
pub mod probe;
pub mod source;

// Re-export main types for convenience
pub use agent::Agent;
pub use config::Settings;
pub use data::{AlertState, Reading, SeriesStore, StatusSnapshot, Thresholds};
pub use notify::{Fact, NotifyError, StatusCard, WebhookNotifier};
pub use probe::{
    CommandProbe, DockerProbe, InternetProbe, ProbeError, ServiceProbe, ServiceStatus,
};
pub use source::{CountKind, DirCursor, Signal};
