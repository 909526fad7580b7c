// Linux procfs-based connection source

use super::{Connection, ConnectionSource, Protocol};
use crate::backends::BackendPriority;
use anyhow::{Context, Result};
use procfs::process::{FDTarget, all_processes};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Connection source using the Linux /proc filesystem
///
/// Socket owners come from /proc/[pid]/fd/ (socket inodes), the table itself
/// from /proc/net/{tcp,tcp6,udp,udp6}.
pub struct ProcfsConnectionSource;

impl ProcfsConnectionSource {
    pub fn new() -> Result<Self> {
        if !Self::is_available() {
            anyhow::bail!("procfs not available (is /proc mounted?)");
        }
        Ok(Self)
    }

    /// Socket inode -> owning PID, for every process we are allowed to inspect
    fn socket_owners() -> Result<HashMap<u64, i32>> {
        let mut owners = HashMap::new();

        for process in all_processes()
            .context("Failed to list processes")?
            .flatten()
        {
            let pid = process.pid();
            let Ok(fds) = process.fd() else {
                continue;
            };
            for fd_info in fds.flatten() {
                if let FDTarget::Socket(inode) = fd_info.target {
                    owners.insert(inode, pid);
                }
            }
        }

        Ok(owners)
    }
}

fn push_entries(
    out: &mut Vec<Connection>,
    owners: &HashMap<u64, i32>,
    protocol: Protocol,
    entries: impl IntoIterator<Item = (SocketAddr, u64)>,
) {
    for (local_address, inode) in entries {
        out.push(Connection {
            local_port: local_address.port(),
            pid: owners.get(&inode).copied(),
            protocol,
        });
    }
}

impl ConnectionSource for ProcfsConnectionSource {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn priority() -> BackendPriority {
        BackendPriority::Best
    }

    fn is_available() -> bool {
        std::path::Path::new("/proc/net/tcp").exists()
    }

    fn list_connections(&self) -> Result<Vec<Connection>> {
        let owners = Self::socket_owners()?;
        let mut connections = Vec::new();

        // A missing table (e.g. IPv6 disabled) just contributes nothing
        if let Ok(entries) = procfs::net::tcp() {
            let rows = entries.into_iter().map(|e| (e.local_address, e.inode));
            push_entries(&mut connections, &owners, Protocol::Tcp, rows);
        }
        if let Ok(entries) = procfs::net::tcp6() {
            let rows = entries.into_iter().map(|e| (e.local_address, e.inode));
            push_entries(&mut connections, &owners, Protocol::Tcp6, rows);
        }
        if let Ok(entries) = procfs::net::udp() {
            let rows = entries.into_iter().map(|e| (e.local_address, e.inode));
            push_entries(&mut connections, &owners, Protocol::Udp, rows);
        }
        if let Ok(entries) = procfs::net::udp6() {
            let rows = entries.into_iter().map(|e| (e.local_address, e.inode));
            push_entries(&mut connections, &owners, Protocol::Udp6, rows);
        }

        log::trace!("procfs: {} connection(s) listed", connections.len());
        Ok(connections)
    }
}
