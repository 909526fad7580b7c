// Run configuration: built-in defaults, optional JSON file, then CLI overrides

use crate::backends::counters::CounterKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = ".config/porttraffic";
const CONFIG_FILE: &str = "config.json";

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of the observation window in seconds
    pub window_secs: u64,

    /// Polling cadence in milliseconds
    pub tick_millis: u64,

    /// How long to wait for monitors to acknowledge stop before aborting them
    pub stop_grace_millis: u64,

    /// Where chart artifacts are written
    pub output_dir: PathBuf,

    /// Chart canvas width in pixels
    pub chart_width: u32,

    /// Chart canvas height in pixels
    pub chart_height: u32,

    /// Only watch these ports (None = every port seen at startup)
    pub ports: Option<Vec<u16>>,

    /// Preferred connection enumeration backend
    pub connection_source: Option<String>,

    /// Preferred I/O counter backend
    pub counter_source: Option<String>,

    /// Which process counters to sample
    pub counter_kind: CounterKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_secs: 60,
            tick_millis: 1000,
            stop_grace_millis: 2000,
            output_dir: PathBuf::from("."),
            // 32x16 chart inches at 96 dpi
            chart_width: 3072,
            chart_height: 1536,
            ports: None,
            connection_source: None,
            counter_source: None,
            counter_kind: CounterKind::default(),
        }
    }
}

impl Config {
    /// Default config file location, if HOME is known
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("Config file not found, using defaults");
                    return Ok(Config::default());
                }
            },
        };

        let contents =
            fs::read_to_string(&path).context(format!("Failed to read config file: {:?}", path))?;
        let config = Self::from_json(&contents)
            .context(format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(contents)?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            anyhow::bail!("window_secs must be greater than zero");
        }
        if self.tick_millis == 0 {
            anyhow::bail!("tick_millis must be greater than zero");
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            anyhow::bail!(
                "chart size must be non-zero, got {}x{}",
                self.chart_width,
                self.chart_height
            );
        }
        if self.tick() > self.window() {
            log::warn!(
                "Tick ({:?}) is longer than the window ({:?}); at most one sample per port",
                self.tick(),
                self.window()
            );
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_millis)
    }

    pub fn chart_size(&self) -> (u32, u32) {
        (self.chart_width, self.chart_height)
    }
}
