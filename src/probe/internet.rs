//! Connectivity probe.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::warn;

/// Answers "is the uplink usable right now".
pub trait InternetProbe {
    /// One synchronous connectivity check. Must not panic; a probe that
    /// cannot run reports offline.
    fn online(&mut self) -> bool;
}

/// Runs an external check command and looks for an `Online` marker in its
/// output.
///
/// The command encapsulates whatever connectivity test the deployment uses
/// (ping, DNS, captive-portal detection); this side only cares about the
/// marker.
#[derive(Debug)]
pub struct CommandProbe {
    command: PathBuf,
}

impl CommandProbe {
    pub fn new<P: AsRef<Path>>(command: P) -> Self {
        Self {
            command: command.as_ref().to_path_buf(),
        }
    }
}

impl InternetProbe for CommandProbe {
    fn online(&mut self) -> bool {
        let output = match Command::new(&self.command).output() {
            Ok(output) => output,
            Err(err) => {
                warn!(command = %self.command.display(), %err, "connectivity check failed to run");
                return false;
            }
        };
        String::from_utf8_lossy(&output.stdout).contains("Online")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_command_reports_offline() {
        let mut probe = CommandProbe::new("/nonexistent/internet_check.sh");
        assert!(!probe.online());
    }
}
