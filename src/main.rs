mod backends;
mod config;
mod error;
mod monitor;
mod orchestrator;
mod render;
mod resolver;
mod sampler;
mod store;

#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::connections::{detect_connection_sources, select_connection_source};
use crate::backends::counters::{CounterKind, detect_counter_sources, select_counter_source};
use crate::backends::BackendInfo;
use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::render::chart::PlottersChart;

/// PortTraffic - sample per-port I/O for a fixed window and chart it
#[derive(Parser, Debug)]
#[command(name = "porttraffic")]
#[command(version)]
#[command(about = "Chart per-port traffic of every local connection over a fixed window", long_about = None)]
struct Args {
    /// Config file (default: ~/.config/porttraffic/config.json if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Observation window in seconds
    #[arg(long, value_name = "SECONDS")]
    window: Option<u64>,

    /// Polling interval in milliseconds
    #[arg(long, value_name = "MILLIS")]
    tick_millis: Option<u64>,

    /// Directory the charts are written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Only watch this port (repeatable)
    #[arg(long = "port", value_name = "PORT")]
    ports: Vec<u16>,

    /// Connection enumeration backend to use
    #[arg(long, value_name = "BACKEND")]
    connection_source: Option<String>,

    /// I/O counter backend to use
    #[arg(long, value_name = "BACKEND")]
    counter_source: Option<String>,

    /// Which process counters to sample
    #[arg(long, value_enum, value_name = "KIND")]
    counter_kind: Option<CounterKind>,

    /// List all available backends and exit
    #[arg(long)]
    list_backends: bool,
}

impl Args {
    /// CLI flags win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(window) = self.window {
            config.window_secs = window;
        }
        if let Some(tick) = self.tick_millis {
            config.tick_millis = tick;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if !self.ports.is_empty() {
            config.ports = Some(self.ports.clone());
        }
        if let Some(name) = &self.connection_source {
            config.connection_source = Some(name.clone());
        }
        if let Some(name) = &self.counter_source {
            config.counter_source = Some(name.clone());
        }
        if let Some(kind) = self.counter_kind {
            config.counter_kind = kind;
        }
    }
}

fn print_backend_group(title: &str, backends: &[BackendInfo]) {
    println!("{}:", title);
    if backends.is_empty() {
        println!("  (none compiled in)");
    }
    for backend in backends {
        let status = if backend.available {
            "available"
        } else {
            "unavailable"
        };
        println!(
            "  {:12} [priority: {:?}] {}",
            backend.name, backend.priority, status
        );
    }
    println!();
}

fn print_available_backends() {
    println!("PortTraffic v{} - Available Backends\n", env!("CARGO_PKG_VERSION"));
    print_backend_group("Connection Sources", &detect_connection_sources());
    print_backend_group("Counter Sources", &detect_counter_sources());
}

fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    if args.list_backends {
        print_available_backends();
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let grace = config.stop_grace();
    run_bounded(grace, run(config))
}

/// Drive `future` on a fresh runtime, then give leftover blocking tasks at most
/// `grace` before exiting.
fn run_bounded<T>(grace: Duration, future: impl Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let result = runtime.block_on(future);

    // Aborted monitors may still be stuck in a blocking OS call
    runtime.shutdown_timeout(grace);
    result
}

async fn run(config: Config) -> Result<()> {
    let connections = select_connection_source(config.connection_source.as_deref())?;
    let counters = select_counter_source(config.counter_source.as_deref(), config.counter_kind)?;
    log::debug!(
        "Using connection source '{}' and counter source '{}' ({:?})",
        connections.name(),
        counters.name(),
        config.counter_kind
    );

    let orchestrator = Orchestrator::new(
        config,
        Arc::from(connections),
        Arc::from(counters),
        Arc::new(PlottersChart),
    );
    let summary = orchestrator.run().await?;

    log::info!(
        "Wrote {} chart(s) for {} port(s), skipped {} idle series",
        summary.report.written.len(),
        summary.ports.len(),
        summary.report.skipped.len()
    );

    if !summary.report.is_success() {
        let failed: Vec<&str> = summary
            .report
            .failures
            .iter()
            .map(|f| f.artifact())
            .collect();
        anyhow::bail!(
            "{} chart(s) could not be written: {}",
            failed.len(),
            failed.join(", ")
        );
    }

    Ok(())
}
