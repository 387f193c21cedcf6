//! Collaborator seams: everything the agent observes that is not an
//! append-only telemetry directory.
//!
//! Each collaborator is queried synchronously once per status-check and is
//! allowed to fail; failures degrade to missing data or a failing check,
//! never to a crash of the loop.
//!
//! ## Submodules
//!
//! - [`services`]: per-service running/version records ([`ServiceProbe`])
//! - [`internet`]: connectivity probe ([`InternetProbe`])
//! - [`system`]: host load, memory, disk and uptime readings

pub mod internet;
pub mod services;
pub mod system;

pub use internet::{CommandProbe, InternetProbe};
pub use services::{DockerProbe, ServiceProbe, ServiceStatus};

use thiserror::Error;

/// Errors from querying a collaborator.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe command could not be run or exited unsuccessfully.
    #[error("probe command failed: {0}")]
    Command(String),

    /// The probe ran but produced output we cannot interpret.
    #[error("probe output unreadable: {0}")]
    Output(String),
}
