//! Per-service health and version records.

use std::process::Command;

use tracing::debug;

use super::ProbeError;

/// One monitored service as the health collaborator reports it.
///
/// When the collaborator fails for a single service, the failure is carried
/// here: `running` is false and `version` holds the error text, so the
/// failure surfaces as an unhealthy fact rather than an exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub name: String,
    pub running: bool,
    pub version: String,
}

/// Capability interface over the service health/version collaborator.
///
/// The agent consumes only this structured form; how the records are
/// obtained (container runtime, process table, stub) is the implementor's
/// business.
pub trait ServiceProbe {
    /// Current status of every monitored service.
    ///
    /// An `Err` means the collaborator as a whole was unreachable; the
    /// caller treats that as missing data for this cycle.
    fn services(&mut self) -> Result<Vec<ServiceStatus>, ProbeError>;
}

/// Probes services running as containers via the `docker` CLI.
///
/// Monitored services share a name prefix (compose project naming); the
/// service name is the segment after the prefix separator, and the version
/// is taken from the image tag.
#[derive(Debug)]
pub struct DockerProbe {
    prefix: String,
}

impl DockerProbe {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn parse_line(&self, line: &str) -> Option<ServiceStatus> {
        let mut fields = line.split('\t');
        let full_name = fields.next()?;
        if !full_name.starts_with(&self.prefix) {
            return None;
        }
        // Compose-style names: project_service_index; the middle segment is
        // the service name.
        let name = full_name
            .split('_')
            .nth(1)
            .unwrap_or(full_name)
            .to_string();

        let (running, version) = match (fields.next(), fields.next()) {
            (Some(state), Some(image)) => {
                let version = image.rsplit(':').next().unwrap_or(image).to_string();
                (state == "running", version)
            }
            _ => {
                debug!(line, "malformed container listing line");
                (false, format!("unparsable status line: {}", line))
            }
        };

        Some(ServiceStatus {
            name,
            running,
            version,
        })
    }
}

impl ServiceProbe for DockerProbe {
    fn services(&mut self) -> Result<Vec<ServiceStatus>, ProbeError> {
        let output = Command::new("docker")
            .args([
                "ps",
                "--all",
                "--format",
                "{{.Names}}\t{{.State}}\t{{.Image}}",
            ])
            .output()
            .map_err(|err| ProbeError::Command(err.to_string()))?;

        if !output.status.success() {
            return Err(ProbeError::Command(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|err| ProbeError::Output(err.to_string()))?;

        Ok(stdout
            .lines()
            .filter_map(|line| self.parse_line(line))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_running_service() {
        let probe = DockerProbe::new("services_");
        let status = probe
            .parse_line("services_power\trunning\tregistry/power:v1.4.2")
            .unwrap();
        assert_eq!(
            status,
            ServiceStatus {
                name: "power".to_string(),
                running: true,
                version: "v1.4.2".to_string(),
            }
        );
    }

    #[test]
    fn test_compose_index_suffix_is_dropped() {
        let probe = DockerProbe::new("services_");
        let status = probe
            .parse_line("services_gps_1\trunning\tregistry/gps:v2.0.0")
            .unwrap();
        assert_eq!(status.name, "gps");
    }

    #[test]
    fn test_parse_stopped_service() {
        let probe = DockerProbe::new("services_");
        let status = probe
            .parse_line("services_gps\texited\tregistry/gps:v2.0.0")
            .unwrap();
        assert!(!status.running);
        assert_eq!(status.name, "gps");
    }

    #[test]
    fn test_unmonitored_containers_are_skipped() {
        let probe = DockerProbe::new("services_");
        assert!(probe
            .parse_line("watchtower\trunning\twatchtower:latest")
            .is_none());
    }

    #[test]
    fn test_malformed_line_is_an_unhealthy_fact() {
        let probe = DockerProbe::new("services_");
        let status = probe.parse_line("services_power").unwrap();
        assert!(!status.running);
        assert!(status.version.contains("unparsable"));
    }
}
