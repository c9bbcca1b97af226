//! Recorder configuration.
//!
//! Environment variables:
//!   - `PMARS_DUMP_FILE`   snapshot destination; absent or empty disables
//!   - `PMARS_DUMP_EVERY`  `N` (every N cycles) or `round`; default 10
//!   - `PMARS_DUMP_RADIUS` window radius in cells; default 10
//!
//! The trace destination has no variable of its own; hosts pass it from
//! their command line through `with_trace_path`.
//!
//! Invalid values fall back to defaults.

use std::path::PathBuf;

use tracing::warn;

use crate::memory_window::DEFAULT_WINDOW_RADIUS;

pub const ENV_DUMP_FILE: &str = "PMARS_DUMP_FILE";
pub const ENV_DUMP_EVERY: &str = "PMARS_DUMP_EVERY";
pub const ENV_DUMP_RADIUS: &str = "PMARS_DUMP_RADIUS";

pub const DEFAULT_DUMP_INTERVAL: u32 = 10;

/// When the session takes snapshots on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpCadence {
    /// Only when the host asks.
    Manual,
    /// On every Nth cycle boundary.
    EveryCycles(u32),
    /// At the end of every round.
    EveryRound,
}

impl Default for DumpCadence {
    fn default() -> Self {
        DumpCadence::EveryCycles(DEFAULT_DUMP_INTERVAL)
    }
}

impl DumpCadence {
    /// `round`, `manual`, or a positive cycle count.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("round") {
            return Some(DumpCadence::EveryRound);
        }
        if raw.eq_ignore_ascii_case("manual") {
            return Some(DumpCadence::Manual);
        }
        match raw.parse::<u32>() {
            Ok(0) | Err(_) => None,
            Ok(n) => Some(DumpCadence::EveryCycles(n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub trace_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    pub cadence: DumpCadence,
    pub window_radius: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            trace_path: None,
            snapshot_path: None,
            cadence: DumpCadence::default(),
            window_radius: DEFAULT_WINDOW_RADIUS,
        }
    }
}

impl RecorderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.snapshot_path = lookup(ENV_DUMP_FILE)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        if let Some(raw) = lookup(ENV_DUMP_EVERY) {
            match DumpCadence::parse(&raw) {
                Some(cadence) => config.cadence = cadence,
                None => warn!(
                    var = ENV_DUMP_EVERY,
                    value = %raw,
                    "invalid dump cadence, using default"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_DUMP_RADIUS) {
            match raw.trim().parse::<u32>() {
                Ok(radius) => config.window_radius = radius,
                Err(_) => warn!(
                    var = ENV_DUMP_RADIUS,
                    value = %raw,
                    "invalid window radius, using default"
                ),
            }
        }

        config
    }

    /// Set the trace destination. Empty paths disable trace recording.
    pub fn with_trace_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.trace_path = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        };
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.snapshot_path = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        };
        self
    }

    pub fn with_cadence(mut self, cadence: DumpCadence) -> Self {
        self.cadence = cadence;
        self
    }
}
