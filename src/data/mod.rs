//! Data models and processing for accumulated telemetry.
//!
//! This module owns everything between raw source activity and the
//! published status snapshot.
//!
//! ## Submodules
//!
//! - [`series`]: per-cycle metric accumulation ([`SeriesStore`])
//! - [`snapshot`]: the flattened last-value view ([`StatusSnapshot`]) and its
//!   staged-then-rename persistence
//! - [`alerts`]: threshold health checks ([`Thresholds`], [`AlertState`])
//! - [`gps`]: plain-text navigation-fix parsing
//!
//! ## Data Flow
//!
//! ```text
//! source files (NDJSON records, fix reports, host probes)
//!        │
//!        ▼
//! SeriesStore::append / ingest_records     (every status-check)
//!        │
//!        ├──▶ alerts::evaluate()           (writes AlertState booleans)
//!        │
//!        └──▶ SeriesStore::snapshot()      (every write cadence, then the
//!             │                             accumulated series are cleared)
//!             ▼
//!        StatusSnapshot::write_staged()
//! ```

pub mod alerts;
pub mod gps;
pub mod series;
pub mod snapshot;

pub use alerts::{AlertState, Thresholds};
pub use series::{Reading, SeriesStore};
pub use snapshot::StatusSnapshot;
