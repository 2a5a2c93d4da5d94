//! Host signal probes and per-cycle record assembly.
//!
//! Each [`Probe`] gathers exactly one signal, such as CPU usage or the set
//! of open ports. A [`collector::SampleCollector`] runs every probe once per
//! cycle and folds the results into a single
//! [`SampleRecord`](hostlog_common::types::SampleRecord) through a
//! [`record::RecordBuilder`], which decides whether a failed probe degrades
//! the record or discards it.

pub mod collector;
mod command;
pub mod cpu;
pub mod disk;
pub mod logins;
pub mod memory;
pub mod network;
pub mod ports;
pub mod process;
pub mod record;
pub mod services;
pub mod users;

pub use collector::{ProbeOptions, ProbeSet, SampleCollector};
pub use record::{CollectError, Field, RecordBuilder};

use std::path::PathBuf;

/// Errors a single probe can report. None of them are fatal on their own;
/// the [`RecordBuilder`] decides what a failure means for the cycle.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The external utility could not be started (not installed, no
    /// permission, ...).
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The external utility ran but exited unsuccessfully.
    #[error("'{program}' exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(&'static str),

    /// The OS answered but the value is unusable (no such mount point, zero
    /// capacity, ...).
    #[error("{0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// A single-signal data source that runs on the agent host.
///
/// Implementations read ambient OS state, must return within the bound of
/// the underlying OS call, and report every failure as a [`ProbeError`]
/// instead of panicking.
pub trait Probe: Send {
    type Output;

    /// Short probe name used in log lines (e.g. `"cpu"`, `"open_ports"`).
    fn name(&self) -> &'static str;

    /// Takes one sample of the signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system call, file read or command
    /// fails, or if the platform is not supported.
    fn probe(&mut self) -> Result<Self::Output>;
}

/// Converts a used/total pair to a percentage clamped to `[0, 100]`.
pub(crate) fn usage_percent(used: u64, total: u64, what: &str) -> Result<f64> {
    if total == 0 {
        return Err(ProbeError::Unavailable(format!("{what} reports zero capacity")));
    }
    clamp_percent(used as f64 / total as f64 * 100.0, what)
}

pub(crate) fn clamp_percent(value: f64, what: &str) -> Result<f64> {
    if !value.is_finite() {
        return Err(ProbeError::Unavailable(format!("{what} usage is not a number")));
    }
    Ok(value.clamp(0.0, 100.0))
}
