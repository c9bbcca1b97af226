//! Trace recorder: append-only binary event log.
//!
//! Lifecycle: `Unopened -> Open -> Closed`. A destination that cannot be
//! opened leaves the recorder `Disabled`; every call on a recorder that is
//! not `Open` is a silent no-op.
//!
//! Two-phase header:
//!   1. open writes a placeholder header (`total_events = 0`)
//!   2. close seeks back and rewrites it with the final count
//!
//! Every record is flushed as it is written so a tailing reader sees
//! progress. A recording abandoned without `close` keeps its events but
//! its header still says zero.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use corewar_host::events::{HostEvent, HostObserver};
use corewar_host::state::HostState;

use crate::error::{RecorderError, Result};
use crate::trace_format::{TraceEvent, TraceEventKind, TraceHeader};

enum TraceState<W> {
    Unopened,
    Open(OpenTrace<W>),
    Closed { events: u32 },
    Disabled,
}

struct OpenTrace<W> {
    writer: W,
    header: TraceHeader,
    event_count: u32,
    /// First append failure. Once set, no further records are written.
    error: Option<io::Error>,
}

impl<W: Write + Seek> OpenTrace<W> {
    fn append(&mut self, event: &TraceEvent) {
        if self.error.is_some() {
            return;
        }
        let result = event
            .write_to(&mut self.writer)
            .and_then(|_| self.writer.flush());
        match result {
            Ok(()) => self.event_count = self.event_count.saturating_add(1),
            Err(err) => {
                warn!(
                    error = %err,
                    events = self.event_count,
                    "trace write failed, dropping further events"
                );
                self.error = Some(err);
            }
        }
    }

    /// Rewrite the header with the final count and release the writer.
    fn finalize(mut self) -> Result<()> {
        self.header.total_events = self.event_count;
        let rewrite = self
            .writer
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.header.write_to(&mut self.writer))
            .and_then(|_| self.writer.flush());

        if let Some(err) = self.error {
            return Err(RecorderError::Io(err));
        }
        rewrite?;
        Ok(())
    }
}

/// Binary event recorder bound to one destination at a time.
pub struct TraceRecorder<W: Write + Seek = File> {
    state: TraceState<W>,
}

impl TraceRecorder<File> {
    /// Create `destination` and start recording.
    ///
    /// An absent or empty path, or a file that cannot be created, leaves
    /// the recorder disabled. The host is never told beyond a log line.
    pub fn open(&mut self, destination: Option<&Path>, host: &HostState) {
        self.finish_previous();

        let path = match destination {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => {
                debug!("trace recording disabled: no destination");
                self.state = TraceState::Disabled;
                return;
            }
        };

        match File::create(path) {
            Ok(file) => {
                info!(path = %path.display(), "trace recording enabled");
                self.open_writer(file, host);
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "cannot open trace destination, recording disabled"
                );
                self.state = TraceState::Disabled;
            }
        }
    }
}

impl<W: Write + Seek> TraceRecorder<W> {
    pub fn new() -> Self {
        Self {
            state: TraceState::Unopened,
        }
    }

    /// Start recording into an already-open destination.
    ///
    /// A session that is still open is finalized first.
    pub fn open_writer(&mut self, mut writer: W, host: &HostState) {
        self.finish_previous();

        let header = TraceHeader::from_host(host);
        let written = header
            .write_to(&mut writer)
            .and_then(|_| writer.flush());
        if let Err(err) = written {
            warn!(error = %err, "cannot write trace header, recording disabled");
            self.state = TraceState::Disabled;
            return;
        }

        self.state = TraceState::Open(OpenTrace {
            writer,
            header,
            event_count: 0,
            error: None,
        });
    }

    /// Append one record stamped with the host's current cycle.
    ///
    /// Addresses are stored as 16 bits, as the format defines.
    pub fn log(
        &mut self,
        host: &HostState,
        kind: TraceEventKind,
        address: u32,
        warrior_id: u8,
        data: u32,
    ) {
        let TraceState::Open(trace) = &mut self.state else {
            return;
        };
        trace.append(&TraceEvent {
            cycle: host.cycle,
            address: address as u16,
            kind,
            warrior_id,
            data,
        });
    }

    // ── Hook wrappers ──────────────────────────────────────────────

    /// Data: opcode code of the executing cell.
    pub fn exec(&mut self, host: &HostState, address: u32) {
        let opcode = host
            .cell(address)
            .map(|cell| cell.opcode.code() as u32)
            .unwrap_or(0);
        self.log(host, TraceEventKind::Exec, address, host.current_warrior_id(), opcode);
    }

    pub fn read(&mut self, host: &HostState, address: u32) {
        self.log(host, TraceEventKind::Read, address, host.current_warrior_id(), 0);
    }

    /// Data: A operand in the high 16 bits, B operand in the low 16 bits.
    pub fn write(&mut self, host: &HostState, address: u32) {
        let packed = host
            .cell(address)
            .map(|cell| ((cell.a_value & 0xFFFF) << 16) | (cell.b_value & 0xFFFF))
            .unwrap_or(0);
        self.log(host, TraceEventKind::Write, address, host.current_warrior_id(), packed);
    }

    pub fn dec(&mut self, host: &HostState, address: u32) {
        self.log(host, TraceEventKind::Dec, address, host.current_warrior_id(), 0);
    }

    pub fn inc(&mut self, host: &HostState, address: u32) {
        self.log(host, TraceEventKind::Inc, address, host.current_warrior_id(), 0);
    }

    /// Address: the host program counter. Data: new task count.
    pub fn spl(&mut self, host: &HostState, warrior_id: u8, tasks: u32) {
        self.log(host, TraceEventKind::Spl, host.pc, warrior_id, tasks);
    }

    /// Data: remaining task count.
    pub fn dat(&mut self, host: &HostState, address: u32, warrior_id: u8, tasks: u32) {
        self.log(host, TraceEventKind::Dat, address, warrior_id, tasks);
    }

    pub fn die(&mut self, host: &HostState, warrior_id: u8) {
        self.log(host, TraceEventKind::Die, 0, warrior_id, 0);
    }

    /// Data: the cycle counter itself.
    pub fn cycle(&mut self, host: &HostState) {
        self.log(host, TraceEventKind::Cycle, 0, host.current_warrior_id(), host.cycle);
    }

    pub fn push(&mut self, host: &HostState, value: u32) {
        self.log(host, TraceEventKind::Push, value, host.current_warrior_id(), 0);
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Finalize the header and release the destination.
    ///
    /// Returns the first write failure of the session, if any. Closing a
    /// recorder that is not open is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, TraceState::Unopened) {
            TraceState::Open(trace) => {
                let events = trace.event_count;
                self.state = TraceState::Closed { events };
                let result = trace.finalize();
                match &result {
                    Ok(()) => info!(events, "trace recording closed"),
                    Err(err) => warn!(events, error = %err, "trace recording closed with errors"),
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
            warn!(error = %err, "previous trace session finished with errors");
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, TraceState::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, TraceState::Closed { .. })
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.state, TraceState::Disabled)
    }

    /// Records successfully appended in the current or last session.
    pub fn event_count(&self) -> u32 {
        match &self.state {
            TraceState::Open(trace) => trace.event_count,
            TraceState::Closed { events } => *events,
            _ => 0,
        }
    }
}

impl<W: Write + Seek> Default for TraceRecorder<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Seek> Drop for TraceRecorder<W> {
    fn drop(&mut self) {
        if let TraceState::Open(trace) = &self.state {
            warn!(
                events = trace.event_count,
                "trace recorder dropped without close, header left unfinalized"
            );
        }
    }
}

impl<W: Write + Seek> HostObserver for TraceRecorder<W> {
    fn on_event(&mut self, host: &HostState, event: &HostEvent) {
        match *event {
            HostEvent::Exec { address } => self.exec(host, address),
            HostEvent::Read { address } => self.read(host, address),
            HostEvent::Write { address } => self.write(host, address),
            HostEvent::Dec { address } => self.dec(host, address),
            HostEvent::Inc { address } => self.inc(host, address),
            HostEvent::Spl { warrior_id, tasks } => self.spl(host, warrior_id, tasks),
            HostEvent::Dat {
                address,
                warrior_id,
                tasks,
            } => self.dat(host, address, warrior_id, tasks),
            HostEvent::Die { warrior_id } => self.die(host, warrior_id),
            HostEvent::Cycle => self.cycle(host),
            HostEvent::Push { value } => self.push(host, value),
        }
    }
}
