// Observation run: seed ports, supervise one monitor per port for the window,
// stop them, then render the final snapshot.

use crate::backends::connections::{Connection, ConnectionSource};
use crate::backends::counters::CounterSource;
use crate::config::Config;
use crate::monitor::{MonitorOutcome, PortMonitor};
use crate::render::chart::ChartSink;
use crate::render::{RenderReport, SnapshotRenderer};
use crate::resolver::PortResolver;
use crate::sampler::CounterSampler;
use crate::store::{SeriesSnapshot, SeriesStore};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Distinct, non-zero local ports from the startup table, optionally restricted
/// to `allow`. Sorted ascending.
pub fn seed_ports(connections: &[Connection], allow: Option<&[u16]>) -> Vec<u16> {
    connections
        .iter()
        .map(|c| c.local_port)
        .filter(|&port| port != 0)
        .filter(|port| allow.is_none_or(|allowed| allowed.contains(port)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunSummary {
    pub ports: Vec<u16>,
    pub snapshot: SeriesSnapshot,
    pub outcomes: Vec<MonitorOutcome>,
    pub report: RenderReport,
}

pub struct Orchestrator {
    config: Config,
    connections: Arc<dyn ConnectionSource>,
    counters: Arc<dyn CounterSource>,
    chart: Arc<dyn ChartSink>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        connections: Arc<dyn ConnectionSource>,
        counters: Arc<dyn CounterSource>,
        chart: Arc<dyn ChartSink>,
    ) -> Self {
        Self {
            config,
            connections,
            counters,
            chart,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let source = self.connections.clone();
        let table = tokio::task::spawn_blocking(move || source.list_connections())
            .await
            .context("Connection enumeration task failed")?
            .context("Failed to enumerate connections at startup")?;

        let ports = seed_ports(&table, self.config.ports.as_deref());
        log::info!(
            "Watching {} port(s) for {:?} (connections: {}, counters: {})",
            ports.len(),
            self.config.window(),
            self.connections.name(),
            self.counters.name()
        );

        let store = SeriesStore::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        let resolver = PortResolver::new(self.connections.clone());
        let sampler = CounterSampler::new(self.counters.clone());

        let mut monitors = JoinSet::new();
        for &port in &ports {
            let monitor = PortMonitor::new(
                port,
                resolver.clone(),
                sampler.clone(),
                store.clone(),
                self.config.tick(),
            );
            monitors.spawn(monitor.run(stop_rx.clone()));
        }
        drop(stop_rx);

        tokio::time::sleep(self.config.window()).await;

        // Nobody listening just means every monitor already stopped on its own
        let _ = stop_tx.send(true);
        let outcomes = join_monitors(&mut monitors, self.config.stop_grace()).await;

        let failed = outcomes.iter().filter(|o| o.reason.is_failure()).count();
        log::info!(
            "Observation window closed: {} monitor(s) finished, {} stopped early",
            outcomes.len(),
            failed
        );

        let snapshot = store.snapshot();
        let renderer = SnapshotRenderer::new(
            self.chart.clone(),
            self.config.output_dir.clone(),
            self.config.chart_size(),
        );
        let to_render = snapshot.clone();
        let report = tokio::task::spawn_blocking(move || renderer.render_all(&to_render))
            .await
            .context("Render task failed")?;

        Ok(RunSummary {
            ports,
            snapshot,
            outcomes,
            report,
        })
    }
}

/// Await every monitor, aborting whatever is still running after `grace`.
async fn join_monitors(
    monitors: &mut JoinSet<MonitorOutcome>,
    grace: Duration,
) -> Vec<MonitorOutcome> {
    let mut outcomes = Vec::with_capacity(monitors.len());
    let deadline = tokio::time::sleep(grace);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            joined = monitors.join_next() => match joined {
                Some(Ok(outcome)) => outcomes.push(outcome),
                Some(Err(e)) => log::error!("Port monitor task failed: {}", e),
                None => break,
            },
            _ = &mut deadline => {
                log::warn!(
                    "{} monitor(s) did not stop within {:?}, aborting",
                    monitors.len(),
                    grace
                );
                monitors.abort_all();
                while monitors.join_next().await.is_some() {}
                break;
            }
        }
    }

    outcomes.sort_by_key(|o| o.port);
    outcomes
}
