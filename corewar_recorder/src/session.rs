//! Recording session: both recorders driven from one host hook.
//!
//! A session is an explicit value owned by the host. The host attaches it
//! as a `HostObserver`, fires events at it, and calls `finish` once the
//! battle is over.
//!
//! Event flow:
//!   1. every event is appended to the trace
//!   2. `Cycle` events also advance the snapshot cadence
//!   3. `end_round` snapshots when the cadence is per round

use std::fs::File;

use tracing::{info, warn};

use corewar_host::events::{HostEvent, HostObserver};
use corewar_host::state::HostState;

use crate::config::{DumpCadence, RecorderConfig};
use crate::error::RecorderError;
use crate::snapshot_recorder::SnapshotRecorder;
use crate::trace_recorder::TraceRecorder;

/// What a finished session wrote.
#[derive(Debug, Default)]
pub struct SessionReport {
    pub trace_events: u32,
    pub snapshots: u64,
    /// Write failures surfaced while closing, trace first.
    pub errors: Vec<RecorderError>,
}

impl SessionReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct RecordingSession {
    trace: TraceRecorder<File>,
    snapshots: SnapshotRecorder<File>,
    cadence: DumpCadence,
    cycles_seen: u64,
}

impl RecordingSession {
    /// Open every recorder the configuration names. Recorders without a
    /// destination, or whose destination cannot be created, stay disabled.
    pub fn open(config: &RecorderConfig, host: &HostState) -> Self {
        let mut trace = TraceRecorder::new();
        trace.open(config.trace_path.as_deref(), host);

        let mut snapshots = SnapshotRecorder::new().with_window_radius(config.window_radius);
        snapshots.open(config.snapshot_path.as_deref(), host);

        Self {
            trace,
            snapshots,
            cadence: config.cadence,
            cycles_seen: 0,
        }
    }

    /// Direct handle on the trace recorder.
    pub fn trace(&mut self) -> &mut TraceRecorder<File> {
        &mut self.trace
    }

    pub fn is_recording(&self) -> bool {
        self.trace.is_open() || self.snapshots.is_open()
    }

    /// Host-chosen snapshot, independent of the cadence.
    pub fn record_snapshot(&mut self, host: &HostState) {
        self.snapshots.record(host);
    }

    pub fn full_dump(&mut self, host: &HostState) {
        self.snapshots.full_dump(host);
    }

    /// Round boundary.
    pub fn end_round(&mut self, host: &HostState) {
        if self.cadence == DumpCadence::EveryRound {
            self.snapshots.record(host);
        }
    }

    fn on_cycle(&mut self, host: &HostState) {
        self.cycles_seen += 1;
        if let DumpCadence::EveryCycles(every) = self.cadence {
            if every > 0 && self.cycles_seen % u64::from(every) == 0 {
                self.snapshots.record(host);
            }
        }
    }

    /// Close both recorders.
    ///
    /// Calling it again reports the same counts with no errors; errors are
    /// handed out once.
    pub fn finish(&mut self) -> SessionReport {
        let mut errors = Vec::new();
        if let Err(err) = self.trace.close() {
            errors.push(err);
        }
        if let Err(err) = self.snapshots.close() {
            errors.push(err);
        }

        let report = SessionReport {
            trace_events: self.trace.event_count(),
            snapshots: self.snapshots.steps_written(),
            errors,
        };
        if report.is_clean() {
            info!(
                trace_events = report.trace_events,
                snapshots = report.snapshots,
                "recording session finished"
            );
        } else {
            warn!(
                errors = report.errors.len(),
                "recording session finished with errors"
            );
        }
        report
    }
}

impl HostObserver for RecordingSession {
    fn on_event(&mut self, host: &HostState, event: &HostEvent) {
        self.trace.on_event(host, event);
        if let HostEvent::Cycle = event {
            self.on_cycle(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    use corewar_host::state::Warrior;

    use crate::trace_format::TraceEventKind;
    use crate::trace_reader::read_trace_file;

    fn host() -> HostState {
        HostState::new(
            8000,
            vec![Warrior::new("Imp", 0, 1), Warrior::new("Dwarf", 4000, 4)],
        )
    }

    fn config(dir: &TempDir, cadence: DumpCadence) -> RecorderConfig {
        RecorderConfig::default()
            .with_trace_path(dir.path().join("battle.trace"))
            .with_snapshot_path(dir.path().join("battle.json"))
            .with_cadence(cadence)
    }

    fn run_cycles(session: &mut RecordingSession, host: &mut HostState, cycles: u32) {
        for _ in 0..cycles {
            session.on_event(host, &HostEvent::Exec { address: host.pc });
            session.on_event(host, &HostEvent::Cycle);
            host.cycle += 1;
        }
    }

    fn steps(dir: &TempDir) -> Vec<Value> {
        let bytes = std::fs::read(dir.path().join("battle.json")).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        doc["execution_steps"].as_array().unwrap().clone()
    }

    #[test]
    fn cycle_cadence_snapshots_every_nth_cycle() {
        let dir = TempDir::new().unwrap();
        let mut host = host();
        let mut session = RecordingSession::open(&config(&dir, DumpCadence::EveryCycles(10)), &host);
        run_cycles(&mut session, &mut host, 25);
        let report = session.finish();

        assert!(report.is_clean());
        assert_eq!(report.trace_events, 50);
        assert_eq!(report.snapshots, 2);

        let steps = steps(&dir);
        assert_eq!(steps.len(), 2);
        // Taken on the 10th and 20th boundary, before the counter moved on.
        assert_eq!(steps[0]["cycle"], 9);
        assert_eq!(steps[1]["cycle"], 19);

        let trace = read_trace_file(&dir.path().join("battle.trace")).unwrap();
        assert!(trace.is_finalized());
        assert_eq!(trace.events.len(), 50);
    }

    #[test]
    fn round_cadence_ignores_cycles() {
        let dir = TempDir::new().unwrap();
        let mut host = host();
        let mut session = RecordingSession::open(&config(&dir, DumpCadence::EveryRound), &host);
        run_cycles(&mut session, &mut host, 30);
        session.end_round(&host);
        host.round += 1;
        run_cycles(&mut session, &mut host, 5);
        session.end_round(&host);
        let report = session.finish();

        assert_eq!(report.snapshots, 2);
        let steps = steps(&dir);
        assert_eq!(steps[0]["round"], 1);
        assert_eq!(steps[1]["round"], 2);
    }

    #[test]
    fn manual_cadence_with_full_dump() {
        let dir = TempDir::new().unwrap();
        let mut host = host();
        let mut session = RecordingSession::open(&config(&dir, DumpCadence::Manual), &host);
        run_cycles(&mut session, &mut host, 12);
        session.end_round(&host);
        session.record_snapshot(&host);
        session.full_dump(&host);
        let report = session.finish();

        assert_eq!(report.snapshots, 2);
        let steps = steps(&dir);
        assert!(steps[0].get("memory_changes").is_some());
        assert_eq!(steps[1]["full_memory"].as_array().unwrap().len(), 8000);
    }

    #[test]
    fn unconfigured_session_records_nothing() {
        let host = host();
        let mut session = RecordingSession::open(&RecorderConfig::default(), &host);
        assert!(!session.is_recording());
        session.on_event(&host, &HostEvent::Cycle);
        session.record_snapshot(&host);
        let report = session.finish();
        assert_eq!(report.trace_events, 0);
        assert_eq!(report.snapshots, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut host = host();
        let mut session = RecordingSession::open(&config(&dir, DumpCadence::Manual), &host);
        run_cycles(&mut session, &mut host, 3);
        let first = session.finish();
        let second = session.finish();
        assert_eq!(first.trace_events, second.trace_events);
        assert_eq!(first.snapshots, second.snapshots);
        assert!(second.is_clean());

        // Events after finish are dropped.
        session.on_event(&host, &HostEvent::Cycle);
        let trace = read_trace_file(&dir.path().join("battle.trace")).unwrap();
        assert_eq!(trace.events.len(), 6);
    }

    #[test]
    fn task_events_logged_through_trace_handle() {
        let dir = TempDir::new().unwrap();
        let host = host();
        let mut session = RecordingSession::open(&config(&dir, DumpCadence::Manual), &host);
        session.trace().spl(&host, 1, 2);
        session.trace().die(&host, 1);
        let report = session.finish();
        assert_eq!(report.trace_events, 2);

        let trace = read_trace_file(&dir.path().join("battle.trace")).unwrap();
        assert_eq!(trace.events[0].kind, TraceEventKind::Spl);
        assert_eq!(trace.events[0].warrior_id, 1);
        assert_eq!(trace.events[0].data, 2);
        assert_eq!(trace.events[1].kind, TraceEventKind::Die);
    }
}
