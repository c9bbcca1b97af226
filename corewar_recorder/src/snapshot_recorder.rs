//! Snapshot recorder: streamed JSON document of execution steps.
//!
//! Document shape:
//!
//! ```text
//! {"simulation_info":{...},"warriors_info":[...],"execution_steps":[
//! {step 0},
//! {step 1}
//! ]}
//! ```
//!
//! Open writes everything up to and including the `[` of
//! `execution_steps`; each record appends one element; close appends the
//! closing `]}`. Until close the file is NOT valid JSON.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use corewar_host::state::HostState;

use crate::error::{RecorderError, Result};
use crate::memory_window::{self, DEFAULT_WINDOW_RADIUS};
use crate::snapshot_types::{FullMemoryRecord, SimulationInfo, StepRecord, WarriorInfo};

enum SnapshotState<W> {
    Unopened,
    Open(OpenSnapshot<W>),
    Closed { steps: u64 },
    Disabled,
}

struct OpenSnapshot<W> {
    writer: W,
    /// Index the next element will carry.
    step: u64,
    error: Option<RecorderError>,
}

impl<W: Write> OpenSnapshot<W> {
    fn write_preamble(writer: &mut W, host: &HostState) -> Result<()> {
        let warriors: Vec<WarriorInfo> = host
            .warriors
            .iter()
            .enumerate()
            .map(|(id, w)| WarriorInfo::from_warrior(id, w))
            .collect();

        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(b"{\"simulation_info\":");
        serde_json::to_writer(&mut buf, &SimulationInfo::from_host(host))?;
        buf.extend_from_slice(b",\"warriors_info\":");
        serde_json::to_writer(&mut buf, &warriors)?;
        buf.extend_from_slice(b",\"execution_steps\":[");

        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }

    /// Append one array element, preceded by a separator unless first.
    ///
    /// The element is rendered in memory and handed to the writer in one
    /// piece, then flushed.
    fn emit<T: Serialize>(&mut self, element: &T) {
        if self.error.is_some() {
            return;
        }
        let separator: &[u8] = if self.step == 0 { b"\n" } else { b",\n" };
        let mut buf = separator.to_vec();
        let result = serde_json::to_writer(&mut buf, element)
            .map_err(RecorderError::from)
            .and_then(|_| self.writer.write_all(&buf).map_err(RecorderError::from))
            .and_then(|_| self.writer.flush().map_err(RecorderError::from));

        match result {
            Ok(()) => self.step += 1,
            Err(err) => {
                warn!(error = %err, step = self.step, "snapshot write failed, dropping further steps");
                self.error = Some(err);
            }
        }
    }

    fn finalize(mut self) -> Result<()> {
        let closing = self
            .writer
            .write_all(b"\n]}\n")
            .and_then(|_| self.writer.flush());
        if let Some(err) = self.error {
            return Err(err);
        }
        closing?;
        Ok(())
    }
}

/// JSON snapshot recorder bound to one destination at a time.
pub struct SnapshotRecorder<W: Write = File> {
    state: SnapshotState<W>,
    window_radius: u32,
}

impl SnapshotRecorder<File> {
    /// Create `destination` and write the document preamble.
    ///
    /// An absent or empty path, or a file that cannot be created, leaves
    /// the recorder disabled.
    pub fn open(&mut self, destination: Option<&Path>, host: &HostState) {
        self.finish_previous();

        let path = match destination {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => {
                debug!("snapshot recording disabled: no destination");
                self.state = SnapshotState::Disabled;
                return;
            }
        };

        match File::create(path) {
            Ok(file) => {
                info!(path = %path.display(), "snapshot recording enabled");
                self.open_writer(file, host);
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "cannot open snapshot destination, recording disabled"
                );
                self.state = SnapshotState::Disabled;
            }
        }
    }
}

impl<W: Write> SnapshotRecorder<W> {
    pub fn new() -> Self {
        Self {
            state: SnapshotState::Unopened,
            window_radius: DEFAULT_WINDOW_RADIUS,
        }
    }

    /// Cells sampled on each side of every center of interest.
    pub fn with_window_radius(mut self, radius: u32) -> Self {
        self.window_radius = radius;
        self
    }

    pub fn open_writer(&mut self, mut writer: W, host: &HostState) {
        self.finish_previous();

        if let Err(err) = OpenSnapshot::write_preamble(&mut writer, host) {
            warn!(error = %err, "cannot write snapshot preamble, recording disabled");
            self.state = SnapshotState::Disabled;
            return;
        }

        self.state = SnapshotState::Open(OpenSnapshot {
            writer,
            step: 0,
            error: None,
        });
    }

    /// Append a windowed snapshot of the current host state.
    pub fn record(&mut self, host: &HostState) {
        let radius = self.window_radius;
        let SnapshotState::Open(snapshot) = &mut self.state else {
            return;
        };
        let memory = memory_window::sample(host, radius);
        let record = StepRecord::from_host(snapshot.step, host, memory);
        snapshot.emit(&record);
    }

    /// Append the whole core, one entry per address. Takes a step index.
    pub fn full_dump(&mut self, host: &HostState) {
        let SnapshotState::Open(snapshot) = &mut self.state else {
            return;
        };
        let record = FullMemoryRecord {
            step: snapshot.step,
            round: host.round,
            cycle: host.cycle,
            full_memory: memory_window::full_core(host),
        };
        snapshot.emit(&record);
    }

    /// Terminate the document and release the destination.
    ///
    /// Returns the first write failure of the session, if any. Closing a
    /// recorder that is not open is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SnapshotState::Unopened) {
            SnapshotState::Open(snapshot) => {
                let steps = snapshot.step;
                self.state = SnapshotState::Closed { steps };
                let result = snapshot.finalize();
                match &result {
                    Ok(()) => info!(steps, "snapshot recording closed"),
                    Err(err) => warn!(steps, error = %err, "snapshot recording closed with errors"),
                }
                result
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    fn finish_previous(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "previous snapshot session finished with errors");
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SnapshotState::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SnapshotState::Closed { .. })
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.state, SnapshotState::Disabled)
    }

    /// Elements written in the current or last session.
    pub fn steps_written(&self) -> u64 {
        match &self.state {
            SnapshotState::Open(snapshot) => snapshot.step,
            SnapshotState::Closed { steps } => *steps,
            _ => 0,
        }
    }
}

impl<W: Write> Default for SnapshotRecorder<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Drop for SnapshotRecorder<W> {
    fn drop(&mut self) {
        if let SnapshotState::Open(snapshot) = &self.state {
            warn!(
                steps = snapshot.step,
                "snapshot recorder dropped without close, document left unterminated"
            );
        }
    }
}
