// Backend trait definitions and core types
//
// Every OS query this tool depends on (who owns a port, how many bytes a
// process has moved) lives behind a trait in this tree so the sampling engine
// never touches the platform directly.

pub mod connections;
pub mod counters;

/// Backend priority ranking (higher = better)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackendPriority {
    Fallback = 1, // Works but coarse (polling a cross-platform library)
    Best = 2,     // Native kernel interface
}

/// Backend metadata used for selection and `--list-backends`
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub name: &'static str,
    pub priority: BackendPriority,
    pub available: bool,
}

/// Pick the backend to instantiate: the explicit preference if given,
/// otherwise the highest-priority available one.
pub(crate) fn pick_backend<'a>(
    detected: &'a [BackendInfo],
    preference: Option<&'a str>,
) -> Option<&'a str> {
    if let Some(name) = preference {
        return Some(name);
    }

    detected
        .iter()
        .filter(|b| b.available)
        .max_by_key(|b| b.priority)
        .map(|b| b.name)
}
