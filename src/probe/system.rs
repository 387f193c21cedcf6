//! Host metrics observable from user space.
//!
//! Every reading is best-effort: a metric that cannot be collected on this
//! host is absent rather than guessed.

use std::path::Path;

/// Used and total memory in megabytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryReading {
    pub used_mb: f64,
    pub total_mb: f64,
}

/// 1-minute load average.
#[cfg(unix)]
pub fn load_average_1m() -> Option<f64> {
    let mut loads = [0f64; 3];
    // SAFETY: getloadavg writes up to 3 doubles into a valid buffer.
    let n = unsafe { libc::getloadavg(loads.as_mut_ptr(), 3) };
    if n < 1 {
        None
    } else {
        Some(loads[0])
    }
}

#[cfg(not(unix))]
pub fn load_average_1m() -> Option<f64> {
    None
}

/// Memory use from /proc/meminfo, with "used" as total minus available.
#[cfg(target_os = "linux")]
pub fn memory() -> Option<MemoryReading> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    let mut total_kb = None;
    let mut available_kb = None;
    for line in meminfo.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<f64>().ok())
        else {
            continue;
        };
        match key {
            "MemTotal" => total_kb = Some(value),
            "MemAvailable" => available_kb = Some(value),
            _ => {}
        }
        if total_kb.is_some() && available_kb.is_some() {
            break;
        }
    }
    let total_kb = total_kb?;
    let available_kb = available_kb?;
    Some(MemoryReading {
        used_mb: ((total_kb - available_kb) / 1024.0).round(),
        total_mb: (total_kb / 1024.0).round(),
    })
}

#[cfg(not(target_os = "linux"))]
pub fn memory() -> Option<MemoryReading> {
    None
}

/// Free space in GB on the filesystem holding `path`, rounded to one
/// decimal.
#[cfg(unix)]
pub fn disk_free_gb(path: &Path) -> Option<f64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path = CString::new(path.as_os_str().as_bytes()).ok()?;
    // SAFETY: statvfs fills the struct when it returns 0.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(path.as_ptr(), &mut stat) };
    if rc != 0 {
        return None;
    }
    let bytes = stat.f_bavail as u64 * stat.f_frsize as u64;
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    Some((gb * 10.0).round() / 10.0)
}

#[cfg(not(unix))]
pub fn disk_free_gb(_path: &Path) -> Option<f64> {
    None
}

/// Seconds since boot, from /proc/uptime.
#[cfg(target_os = "linux")]
pub fn uptime_seconds() -> Option<f64> {
    let raw = std::fs::read_to_string("/proc/uptime").ok()?;
    raw.split_whitespace().next()?.parse().ok()
}

#[cfg(not(target_os = "linux"))]
pub fn uptime_seconds() -> Option<f64> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn test_load_average_is_nonnegative() {
        let load = load_average_1m().unwrap();
        assert!(load >= 0.0);
    }

    #[test]
    fn test_memory_reading_is_consistent() {
        let reading = memory().unwrap();
        assert!(reading.total_mb > 0.0);
        assert!(reading.used_mb >= 0.0);
        assert!(reading.used_mb <= reading.total_mb);
    }

    #[test]
    fn test_disk_free_on_root() {
        let free = disk_free_gb(Path::new("/")).unwrap();
        assert!(free >= 0.0);
    }

    #[test]
    fn test_uptime_advances_from_zero() {
        assert!(uptime_seconds().unwrap() > 0.0);
    }
}
