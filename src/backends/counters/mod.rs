// Per-process cumulative I/O counter backends

use super::{BackendInfo, BackendPriority, pick_backend};
use crate::error::SamplingError;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[cfg(target_os = "linux")]
mod procfs;
#[cfg(feature = "counters-sysinfo")]
mod sysinfo;

#[cfg(target_os = "linux")]
pub use self::procfs::ProcfsCounterSource;
#[cfg(feature = "counters-sysinfo")]
pub use self::sysinfo::SysinfoCounterSource;

/// Cumulative byte totals for one process since it started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCounters {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Which kernel totals to read
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    /// Bytes that reached the storage layer (read_bytes / write_bytes)
    #[default]
    Storage,
    /// Bytes passed through read/write syscalls, sockets included (rchar / wchar)
    Chars,
}

/// Process I/O counter backend trait
pub trait CounterSource: Send + Sync {
    /// Backend name (e.g., "procfs", "sysinfo")
    fn name(&self) -> &'static str;

    /// Backend priority for auto-selection
    fn priority() -> BackendPriority
    where
        Self: Sized;

    /// Check if this backend is available on the current system
    fn is_available() -> bool
    where
        Self: Sized;

    /// Read the current cumulative counters of `pid`
    fn io_counters(&self, pid: i32) -> Result<IoCounters, SamplingError>;
}

/// Detect all counter sources compiled for this platform
pub fn detect_counter_sources() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = Vec::new();

    #[cfg(target_os = "linux")]
    backends.push(BackendInfo {
        name: "procfs",
        priority: ProcfsCounterSource::priority(),
        available: ProcfsCounterSource::is_available(),
    });

    #[cfg(feature = "counters-sysinfo")]
    backends.push(BackendInfo {
        name: "sysinfo",
        priority: SysinfoCounterSource::priority(),
        available: SysinfoCounterSource::is_available(),
    });

    backends
}

/// Auto-select a counter source, or build the one named by `preference`
pub fn select_counter_source(
    preference: Option<&str>,
    kind: CounterKind,
) -> Result<Box<dyn CounterSource>> {
    let detected = detect_counter_sources();
    let name = pick_backend(&detected, preference)
        .ok_or_else(|| anyhow::anyhow!("No I/O counter source available on this platform"))?;

    create_counter_source(name, kind)
}

fn create_counter_source(name: &str, kind: CounterKind) -> Result<Box<dyn CounterSource>> {
    match name {
        #[cfg(target_os = "linux")]
        "procfs" => Ok(Box::new(ProcfsCounterSource::new(kind)?)),

        #[cfg(feature = "counters-sysinfo")]
        "sysinfo" => {
            if kind == CounterKind::Chars {
                log::warn!("sysinfo only reports storage counters, ignoring counter kind 'chars'");
            }
            Ok(Box::new(SysinfoCounterSource::new()))
        }

        _ => {
            let _ = kind;
            Err(anyhow::anyhow!("Unknown counter source: {}", name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_kind_serde_names() {
        let kind: CounterKind = serde_json::from_str("\"chars\"").unwrap();
        assert_eq!(kind, CounterKind::Chars);
        assert_eq!(
            serde_json::to_string(&CounterKind::Storage).unwrap(),
            "\"storage\""
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_detected_priorities_come_from_backends() {
        let detected = detect_counter_sources();
        let procfs = detected.iter().find(|b| b.name == "procfs").unwrap();
        assert_eq!(procfs.priority, BackendPriority::Best);

        if let Some(sysinfo) = detected.iter().find(|b| b.name == "sysinfo") {
            assert!(sysinfo.priority < procfs.priority);
        }
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        assert!(select_counter_source(Some("wmi"), CounterKind::Storage).is_err());
    }
}
