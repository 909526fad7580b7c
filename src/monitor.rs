// Per-port sampling loop
//
// One PortMonitor runs per watched port. It registers the port in the store,
// then once per tick resolves the owning process, reads its counters and
// appends them. The first resolution or sampling failure ends the monitor;
// other ports are never affected.

use crate::backends::counters::IoCounters;
use crate::error::{ResolutionError, SamplingError, StopReason};
use crate::resolver::PortResolver;
use crate::sampler::CounterSampler;
use crate::store::SeriesStore;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Initializing,
    Sampling,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Initializing => "initializing",
            MonitorState::Sampling => "sampling",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What a finished monitor reports back to its supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub port: u16,
    /// Successful polls appended to the store
    pub ticks: usize,
    pub reason: StopReason,
}

pub struct PortMonitor {
    port: u16,
    resolver: PortResolver,
    sampler: CounterSampler,
    store: SeriesStore,
    tick: Duration,
    state: MonitorState,
}

impl PortMonitor {
    pub fn new(
        port: u16,
        resolver: PortResolver,
        sampler: CounterSampler,
        store: SeriesStore,
        tick: Duration,
    ) -> Self {
        Self {
            port,
            resolver,
            sampler,
            store,
            tick,
            state: MonitorState::Initializing,
        }
    }

    fn transition(&mut self, next: MonitorState) {
        log::debug!("{}: monitor {} -> {}", self.port, self.state, next);
        self.state = next;
    }

    /// Sample until a failure or until `stop` flips to true (or its sender is dropped).
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> MonitorOutcome {
        if !self.store.create_series(self.port) {
            log::warn!("{}: series already registered, appending to it", self.port);
        }
        self.transition(MonitorState::Sampling);

        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0;
        let mut last_pid = None;

        let reason = loop {
            tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped) => break StopReason::WindowClosed,
                _ = ticker.tick() => {}
            }

            let (pid, counters) = match self.poll().await {
                Ok(reading) => reading,
                Err(reason) => break reason,
            };

            if last_pid.is_some_and(|last| last != pid) {
                log::info!(
                    "{}: owner changed from PID {} to PID {}",
                    self.port,
                    last_pid.unwrap_or_default(),
                    pid
                );
            }
            last_pid = Some(pid);

            log::info!(
                "{}: received bytes: {}, sent bytes: {}",
                self.port,
                counters.bytes_read,
                counters.bytes_written
            );
            self.store.append(self.port, pid, counters);
            ticks += 1;
        };

        self.transition(MonitorState::Stopped);
        if reason.is_failure() {
            log::warn!("{}: {}", self.port, reason);
        } else {
            log::debug!("{}: {} after {} tick(s)", self.port, reason, ticks);
        }

        MonitorOutcome {
            port: self.port,
            ticks,
            reason,
        }
    }

    /// One tick: resolve the owner, then read its counters.
    ///
    /// Both OS queries run on the blocking pool so a slow one stalls only this port.
    async fn poll(&self) -> Result<(i32, IoCounters), StopReason> {
        let port = self.port;

        let resolver = self.resolver.clone();
        let pid = tokio::task::spawn_blocking(move || resolver.resolve(port))
            .await
            .unwrap_or_else(|e| Err(ResolutionError::Enumeration(port, e.to_string())))?;

        let sampler = self.sampler.clone();
        let counters = tokio::task::spawn_blocking(move || sampler.sample(pid))
            .await
            .unwrap_or_else(|e| Err(SamplingError::CountersUnavailable(pid, e.to_string())))?;

        Ok((pid, counters))
    }
}
