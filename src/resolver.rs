// Port -> owning process resolution

use crate::backends::connections::{Connection, ConnectionSource};
use crate::error::ResolutionError;
use std::sync::Arc;

/// Scan a connection table for the first visible owner of `port`.
pub fn find_owner(connections: &[Connection], port: u16) -> Result<i32, ResolutionError> {
    let mut seen = false;

    for conn in connections.iter().filter(|c| c.local_port == port) {
        seen = true;
        if let Some(pid) = conn.pid {
            return Ok(pid);
        }
    }

    if seen {
        Err(ResolutionError::OwnerUnknown(port))
    } else {
        Err(ResolutionError::NotFound(port))
    }
}

/// Resolves which process currently owns a local port
#[derive(Clone)]
pub struct PortResolver {
    source: Arc<dyn ConnectionSource>,
}

impl PortResolver {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self { source }
    }

    /// Re-read the full connection table and return the owner of `port`.
    pub fn resolve(&self, port: u16) -> Result<i32, ResolutionError> {
        let connections = self
            .source
            .list_connections()
            .map_err(|e| ResolutionError::Enumeration(port, format!("{:#}", e)))?;

        find_owner(&connections, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendPriority;
    use crate::backends::connections::Protocol;

    fn conn(local_port: u16, pid: Option<i32>) -> Connection {
        Connection {
            local_port,
            pid,
            protocol: Protocol::Tcp,
        }
    }

    struct BrokenSource;

    impl ConnectionSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn priority() -> BackendPriority {
            BackendPriority::Fallback
        }

        fn is_available() -> bool {
            true
        }

        fn list_connections(&self) -> anyhow::Result<Vec<Connection>> {
            anyhow::bail!("permission denied")
        }
    }

    #[test]
    fn test_first_match_wins() {
        let table = vec![conn(22, Some(1)), conn(80, Some(10)), conn(80, Some(11))];
        assert_eq!(find_owner(&table, 80), Ok(10));
    }

    #[test]
    fn test_skips_entries_without_owner() {
        let table = vec![conn(443, None), conn(443, Some(12))];
        assert_eq!(find_owner(&table, 443), Ok(12));
    }

    #[test]
    fn test_not_found_vs_owner_unknown() {
        let table = vec![conn(53, None)];
        assert_eq!(find_owner(&table, 80), Err(ResolutionError::NotFound(80)));
        assert_eq!(
            find_owner(&table, 53),
            Err(ResolutionError::OwnerUnknown(53))
        );
    }

    #[test]
    fn test_enumeration_failure_is_reported() {
        let resolver = PortResolver::new(Arc::new(BrokenSource));
        match resolver.resolve(8080) {
            Err(ResolutionError::Enumeration(8080, msg)) => {
                assert!(msg.contains("permission denied"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
