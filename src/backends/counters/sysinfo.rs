// Cross-platform I/O counter source using sysinfo's per-process disk usage

use super::{CounterSource, IoCounters};
use crate::backends::BackendPriority;
use crate::error::SamplingError;
use std::sync::{Mutex, PoisonError};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

pub struct SysinfoCounterSource {
    // One System shared by all monitors; each sample refreshes a single pid
    system: Mutex<System>,
}

impl SysinfoCounterSource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl CounterSource for SysinfoCounterSource {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn priority() -> BackendPriority {
        BackendPriority::Fallback
    }

    fn is_available() -> bool {
        sysinfo::IS_SUPPORTED_SYSTEM
    }

    fn io_counters(&self, pid: i32) -> Result<IoCounters, SamplingError> {
        let target = u32::try_from(pid).map_err(|_| SamplingError::ProcessGone(pid))?;
        let target = Pid::from_u32(target);

        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let updated = system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            ProcessRefreshKind::new().with_disk_usage(),
        );

        // A targeted refresh never evicts dead pids, so the cached entry would
        // keep answering with its last counters. Start over with an empty cache.
        if updated == 0 {
            *system = System::new();
            return Err(SamplingError::ProcessGone(pid));
        }

        let process = system
            .process(target)
            .ok_or(SamplingError::ProcessGone(pid))?;
        let usage = process.disk_usage();

        Ok(IoCounters {
            bytes_read: usage.total_read_bytes,
            bytes_written: usage.total_written_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_pid_is_gone() {
        let source = SysinfoCounterSource::new();
        assert_eq!(source.io_counters(-1), Err(SamplingError::ProcessGone(-1)));
    }

    #[cfg(unix)]
    #[test]
    fn test_reaped_process_is_gone() {
        let source = SysinfoCounterSource::new();
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let pid = child.id() as i32;

        assert!(source.io_counters(pid).is_ok());

        child.kill().unwrap();
        child.wait().unwrap();

        assert_eq!(source.io_counters(pid), Err(SamplingError::ProcessGone(pid)));
    }
}
