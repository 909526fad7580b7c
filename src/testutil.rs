// Scriptable stand-ins for the OS collaborators

use crate::backends::BackendPriority;
use crate::backends::connections::{Connection, ConnectionSource, Protocol};
use crate::backends::counters::{CounterSource, IoCounters};
use crate::error::SamplingError;
use crate::render::chart::{ChartRequest, ChartSink};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

pub fn tcp(local_port: u16, pid: i32) -> Connection {
    Connection {
        local_port,
        pid: Some(pid),
        protocol: Protocol::Tcp,
    }
}

/// Replays connection tables in order; the last table repeats forever.
pub struct FakeConnections {
    tables: Mutex<VecDeque<Vec<Connection>>>,
}

impl FakeConnections {
    pub fn fixed(table: Vec<Connection>) -> Self {
        Self::scripted(vec![table])
    }

    pub fn scripted(tables: Vec<Vec<Connection>>) -> Self {
        Self {
            tables: Mutex::new(tables.into()),
        }
    }
}

impl ConnectionSource for FakeConnections {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn priority() -> BackendPriority {
        BackendPriority::Fallback
    }

    fn is_available() -> bool {
        true
    }

    fn list_connections(&self) -> anyhow::Result<Vec<Connection>> {
        let mut tables = self.tables.lock().unwrap();
        if tables.len() > 1 {
            Ok(tables.pop_front().unwrap())
        } else {
            Ok(tables.front().cloned().unwrap_or_default())
        }
    }
}

/// Hands out queued readings per pid; an exhausted queue means the process is gone.
#[derive(Default)]
pub struct FakeCounters {
    readings: Mutex<HashMap<i32, VecDeque<IoCounters>>>,
}

impl FakeCounters {
    pub fn with(mut self, pid: i32, readings: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let queue = readings
            .into_iter()
            .map(|(bytes_read, bytes_written)| IoCounters {
                bytes_read,
                bytes_written,
            })
            .collect();
        self.readings.get_mut().unwrap().insert(pid, queue);
        self
    }
}

impl CounterSource for FakeCounters {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn priority() -> BackendPriority {
        BackendPriority::Fallback
    }

    fn is_available() -> bool {
        true
    }

    fn io_counters(&self, pid: i32) -> Result<IoCounters, SamplingError> {
        self.readings
            .lock()
            .unwrap()
            .get_mut(&pid)
            .and_then(|queue| queue.pop_front())
            .ok_or(SamplingError::ProcessGone(pid))
    }
}

/// A chart request as seen by the fake sink
#[derive(Debug, Clone)]
pub struct RecordedChart {
    pub series_label: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
    pub size: (u32, u32),
    pub path: PathBuf,
}

/// Records chart requests; fails for any series label listed in `failing`.
#[derive(Default)]
pub struct FakeChart {
    pub drawn: Mutex<Vec<RecordedChart>>,
    pub failing: Vec<String>,
}

impl FakeChart {
    pub fn failing_on(labels: &[&str]) -> Self {
        Self {
            drawn: Mutex::default(),
            failing: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.drawn
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.series_label.clone())
            .collect()
    }
}

impl ChartSink for FakeChart {
    fn draw_line_chart(&self, request: &ChartRequest<'_>) -> anyhow::Result<()> {
        if self.failing.iter().any(|l| l == request.series_label) {
            anyhow::bail!("disk full");
        }
        self.drawn.lock().unwrap().push(RecordedChart {
            series_label: request.series_label.to_string(),
            x_label: request.x_label.to_string(),
            y_label: request.y_label.to_string(),
            points: request.points.to_vec(),
            size: request.size,
            path: request.path.to_path_buf(),
        });
        Ok(())
    }
}
