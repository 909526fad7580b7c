// Shared per-port series of cumulative byte counts
//
// Every monitor writes through one `SeriesStore` handle. A single mutex guards
// the whole map: registration, appends and the final snapshot are mutually
// exclusive, and each port has exactly one writer, so per-port append order is
// tick order.

use crate::backends::counters::IoCounters;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Traffic direction of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Received,
    Sent,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Received, Direction::Sent];

    pub fn label(self) -> &'static str {
        match self {
            Direction::Received => "Received",
            Direction::Sent => "Sent",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Both series of one port, plus where the owning process changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSeries {
    pub received: Vec<u64>,
    pub sent: Vec<u64>,
    /// Sample indices that start a new owner (pid changed since the previous sample)
    pub breaks: Vec<usize>,
    last_pid: Option<i32>,
}

impl PortSeries {
    /// Series pair with a single owner throughout
    #[cfg(test)]
    pub(crate) fn from_samples(received: Vec<u64>, sent: Vec<u64>) -> Self {
        Self {
            received,
            sent,
            ..Default::default()
        }
    }

    pub fn series(&self, direction: Direction) -> &[u64] {
        match direction {
            Direction::Received => &self.received,
            Direction::Sent => &self.sent,
        }
    }

    /// Number of successful polls recorded
    pub fn len(&self) -> usize {
        self.received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    fn push(&mut self, pid: i32, counters: IoCounters) {
        if self.last_pid.is_some_and(|last| last != pid) {
            self.breaks.push(self.received.len());
        }
        self.last_pid = Some(pid);
        self.received.push(counters.bytes_read);
        self.sent.push(counters.bytes_written);
    }
}

/// Final, ordered copy of the store
pub type SeriesSnapshot = BTreeMap<u16, PortSeries>;

#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    inner: Arc<Mutex<HashMap<u16, PortSeries>>>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the map consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, HashMap<u16, PortSeries>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an empty series pair for `port`.
    ///
    /// Returns false if the port was already registered; existing samples are kept.
    pub fn create_series(&self, port: u16) -> bool {
        let mut map = self.lock();
        if map.contains_key(&port) {
            return false;
        }
        map.insert(port, PortSeries::default());
        true
    }

    /// Append one tick's counters (both directions) for `port`.
    ///
    /// Returns false if the port was never registered.
    pub fn append(&self, port: u16, pid: i32, counters: IoCounters) -> bool {
        match self.lock().get_mut(&port) {
            Some(series) => {
                series.push(pid, counters);
                true
            }
            None => false,
        }
    }

    /// Full copy of every entry, keyed in port order
    pub fn snapshot(&self) -> SeriesSnapshot {
        self.lock()
            .iter()
            .map(|(port, series)| (*port, series.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
