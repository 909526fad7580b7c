// Process -> cumulative I/O counters

use crate::backends::counters::{CounterSource, IoCounters};
use crate::error::SamplingError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CounterSampler {
    source: Arc<dyn CounterSource>,
}

impl CounterSampler {
    pub fn new(source: Arc<dyn CounterSource>) -> Self {
        Self { source }
    }

    pub fn sample(&self, pid: i32) -> Result<IoCounters, SamplingError> {
        self.source.io_counters(pid)
    }
}
