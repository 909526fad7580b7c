// Linux procfs-based I/O counter source (/proc/[pid]/io)

use super::{CounterKind, CounterSource, IoCounters};
use crate::backends::BackendPriority;
use crate::error::SamplingError;
use anyhow::Result;
use procfs::ProcError;
use procfs::process::Process;

pub struct ProcfsCounterSource {
    kind: CounterKind,
}

impl ProcfsCounterSource {
    pub fn new(kind: CounterKind) -> Result<Self> {
        if !Self::is_available() {
            anyhow::bail!("/proc/self/io not readable (kernel built without task I/O accounting?)");
        }
        Ok(Self { kind })
    }
}

fn sampling_error(pid: i32, err: ProcError) -> SamplingError {
    match err {
        ProcError::NotFound(_) => SamplingError::ProcessGone(pid),
        other => SamplingError::CountersUnavailable(pid, other.to_string()),
    }
}

impl CounterSource for ProcfsCounterSource {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn priority() -> BackendPriority {
        BackendPriority::Best
    }

    fn is_available() -> bool {
        std::path::Path::new("/proc/self/io").exists()
    }

    fn io_counters(&self, pid: i32) -> Result<IoCounters, SamplingError> {
        let process = Process::new(pid).map_err(|e| sampling_error(pid, e))?;
        let io = process.io().map_err(|e| sampling_error(pid, e))?;

        Ok(match self.kind {
            CounterKind::Storage => IoCounters {
                bytes_read: io.read_bytes,
                bytes_written: io.write_bytes,
            },
            CounterKind::Chars => IoCounters {
                bytes_read: io.rchar,
                bytes_written: io.wchar,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_process_is_gone() {
        assert_eq!(
            sampling_error(77, ProcError::NotFound(None)),
            SamplingError::ProcessGone(77)
        );
    }

    #[test]
    fn test_own_counters_are_readable() {
        if !ProcfsCounterSource::is_available() {
            return;
        }
        let source = ProcfsCounterSource::new(CounterKind::Chars).unwrap();
        let pid = std::process::id() as i32;

        let first = source.io_counters(pid).unwrap();
        let second = source.io_counters(pid).unwrap();

        assert!(second.bytes_read >= first.bytes_read);
    }
}
