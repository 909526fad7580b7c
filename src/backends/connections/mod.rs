// Connection enumeration backends
//
// A connection source returns the host's current socket table ("all" scope:
// tcp, tcp6, udp, udp6) with the owning process for each local endpoint.

use super::{BackendInfo, BackendPriority, pick_backend};
use anyhow::Result;

#[cfg(target_os = "linux")]
mod procfs;

#[cfg(target_os = "linux")]
pub use self::procfs::ProcfsConnectionSource;

/// Transport protocol of a socket table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Tcp6,
    Udp,
    Udp6,
}

/// One row of the socket table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub local_port: u16,
    /// Owning process, `None` when the owner is not visible to us
    pub pid: Option<i32>,
    pub protocol: Protocol,
}

/// Socket table backend trait
pub trait ConnectionSource: Send + Sync {
    /// Backend name (e.g., "procfs")
    fn name(&self) -> &'static str;

    /// Backend priority for auto-selection
    fn priority() -> BackendPriority
    where
        Self: Sized;

    /// Check if this backend is available on the current system
    fn is_available() -> bool
    where
        Self: Sized;

    /// Snapshot the full connection table
    fn list_connections(&self) -> Result<Vec<Connection>>;
}

/// Detect all connection sources compiled for this platform
pub fn detect_connection_sources() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = Vec::new();

    #[cfg(target_os = "linux")]
    backends.push(BackendInfo {
        name: "procfs",
        priority: ProcfsConnectionSource::priority(),
        available: ProcfsConnectionSource::is_available(),
    });

    backends
}

/// Auto-select a connection source, or build the one named by `preference`
pub fn select_connection_source(preference: Option<&str>) -> Result<Box<dyn ConnectionSource>> {
    let detected = detect_connection_sources();
    let name = pick_backend(&detected, preference)
        .ok_or_else(|| anyhow::anyhow!("No connection source available on this platform"))?;

    create_connection_source(name)
}

fn create_connection_source(name: &str) -> Result<Box<dyn ConnectionSource>> {
    match name {
        #[cfg(target_os = "linux")]
        "procfs" => Ok(Box::new(ProcfsConnectionSource::new()?)),

        _ => Err(anyhow::anyhow!("Unknown connection source: {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_source_is_rejected() {
        let err = select_connection_source(Some("netstat")).err().unwrap();
        assert!(err.to_string().contains("netstat"));
    }
}
