// Failure taxonomy for the sampling engine
//
// Resolution and sampling failures are local to a single port monitor and end
// it. Render failures are collected per artifact by the renderer.

use thiserror::Error;

/// The port has no usable owning connection right now.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no process found for port {0}")]
    NotFound(u16),

    #[error("port {0} is in use but its owning process is not visible")]
    OwnerUnknown(u16),

    #[error("failed to enumerate connections for port {0}: {1}")]
    Enumeration(u16, String),
}

/// The owning process vanished or its counters cannot be read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("process {0} no longer exists")]
    ProcessGone(i32),

    #[error("I/O counters for process {0} unavailable: {1}")]
    CountersUnavailable(i32, String),
}

/// A chart artifact could not be produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("cannot create output directory {0}: {1}")]
    OutputDir(String, String),

    #[error("failed to render {0}: {1}")]
    Chart(String, String),
}

impl RenderError {
    /// Path of the directory or chart file that failed
    pub fn artifact(&self) -> &str {
        match self {
            RenderError::OutputDir(path, _) | RenderError::Chart(path, _) => path,
        }
    }
}

/// Why a port monitor left its sampling loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StopReason {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error("observation window closed")]
    WindowClosed,
}

impl StopReason {
    /// Whether the monitor ended because of a failure rather than shutdown
    pub fn is_failure(&self) -> bool {
        !matches!(self, StopReason::WindowClosed)
    }
}
