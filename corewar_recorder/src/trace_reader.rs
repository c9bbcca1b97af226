//! Trace reader: load, inspect and compare recorded traces.
//!
//! Reading rules:
//!   - Wrong magic is rejected
//!   - Unknown versions load with the minimal header field set
//!   - A partial record at end of file is counted, not an error
//!   - `total_events` is trusted only through `is_finalized`

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::trace_format::{TraceEvent, TraceEventKind, TraceHeader, EVENT_SIZE, HEADER_SIZE};

/// A fully loaded trace.
#[derive(Debug, Clone)]
pub struct TraceFile {
    pub header: TraceHeader,
    pub events: Vec<TraceEvent>,
    /// Bytes after the last complete record.
    pub trailing_bytes: usize,
}

impl TraceFile {
    /// True when the header count matches the records present, i.e. the
    /// recording was closed normally.
    pub fn is_finalized(&self) -> bool {
        self.header.total_events as usize == self.events.len()
    }

    /// Number of records per event kind.
    pub fn kind_counts(&self) -> BTreeMap<TraceEventKind, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Streaming reader over a trace.
pub struct TraceReader<R: Read> {
    reader: R,
    trailing_bytes: usize,
}

impl<R: Read> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            trailing_bytes: 0,
        }
    }

    /// Read the fixed-size header.
    pub fn read_header(&mut self) -> Result<TraceHeader> {
        let mut buf = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut buf)?;
        TraceHeader::decode(&buf[..read])
    }

    /// Next complete record, or `None` at end of stream.
    pub fn next_event(&mut self) -> Result<Option<TraceEvent>> {
        let mut buf = [0u8; EVENT_SIZE];
        match read_full(&mut self.reader, &mut buf)? {
            0 => Ok(None),
            n if n < EVENT_SIZE => {
                self.trailing_bytes = n;
                Ok(None)
            }
            _ => Ok(Some(TraceEvent::decode(&buf))),
        }
    }

    /// Header plus every complete record.
    pub fn read_all(mut self) -> Result<TraceFile> {
        let header = self.read_header()?;
        // The header count is untrusted input; cap the preallocation.
        let mut events = Vec::with_capacity((header.total_events as usize).min(1 << 16));
        while let Some(event) = self.next_event()? {
            events.push(event);
        }
        Ok(TraceFile {
            header,
            events,
            trailing_bytes: self.trailing_bytes,
        })
    }
}

/// Fill `buf` as far as the stream allows; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub fn read_trace_file(path: &Path) -> Result<TraceFile> {
    let file = File::open(path)?;
    TraceReader::new(BufReader::new(file)).read_all()
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// SHA-256 over the encoded event records. Lowercase hex.
///
/// The header is left out so that a finalized trace and an unfinalized
/// copy of the same run hash identically.
pub fn trace_digest(trace: &TraceFile) -> String {
    let mut hasher = Sha256::new();
    for event in &trace.events {
        hasher.update(event.encode());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Where two recordings first disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub index: usize,
    pub left: Option<TraceEvent>,
    pub right: Option<TraceEvent>,
}

/// First record index at which the two traces differ, including one
/// trace ending before the other. `None` when the event streams match.
pub fn first_divergence(left: &TraceFile, right: &TraceFile) -> Option<Divergence> {
    let longest = left.events.len().max(right.events.len());
    (0..longest).find_map(|index| {
        let a = left.events.get(index).copied();
        let b = right.events.get(index).copied();
        if a == b {
            None
        } else {
            Some(Divergence {
                index,
                left: a,
                right: b,
            })
        }
    })
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {}: ", self.index)?;
        describe(f, self.left.as_ref())?;
        write!(f, " vs ")?;
        describe(f, self.right.as_ref())
    }
}

fn describe(f: &mut fmt::Formatter<'_>, event: Option<&TraceEvent>) -> fmt::Result {
    match event {
        Some(e) => write!(
            f,
            "{} cycle={} addr={} warrior={} data={}",
            e.kind.name(),
            e.cycle,
            e.address,
            e.warrior_id,
            e.data
        ),
        None => write!(f, "<end of trace>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use corewar_host::state::{HostState, Warrior};

    use crate::error::RecorderError;
    use crate::trace_recorder::TraceRecorder;

    fn record(addresses: &[u32]) -> Vec<u8> {
        let mut buf = Vec::new();
        let host = HostState::new(8000, vec![Warrior::new("Imp", 0, 1)]);
        {
            let mut recorder = TraceRecorder::new();
            recorder.open_writer(Cursor::new(&mut buf), &host);
            for &addr in addresses {
                recorder.read(&host, addr);
            }
            recorder.close().unwrap();
        }
        buf
    }

    fn load(bytes: &[u8]) -> TraceFile {
        TraceReader::new(bytes).read_all().unwrap()
    }

    #[test]
    fn reads_back_recorded_events() {
        let trace = load(&record(&[1, 2, 3]));
        assert!(trace.is_finalized());
        assert_eq!(trace.trailing_bytes, 0);
        let addrs: Vec<u16> = trace.events.iter().map(|e| e.address).collect();
        assert_eq!(addrs, vec![1, 2, 3]);
        assert_eq!(trace.kind_counts().get(&TraceEventKind::Read), Some(&3));
    }

    #[test]
    fn unfinalized_trace_is_detected() {
        let mut bytes = record(&[1, 2]);
        // Zero the event count as an interrupted run would leave it.
        bytes[20..24].copy_from_slice(&0u32.to_le_bytes());
        let trace = load(&bytes);
        assert_eq!(trace.events.len(), 2);
        assert!(!trace.is_finalized());
    }

    #[test]
    fn partial_trailing_record_is_counted() {
        let mut bytes = record(&[1]);
        bytes.extend_from_slice(&[0xAA; 5]);
        let trace = load(&bytes);
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.trailing_bytes, 5);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = record(&[]);
        bytes[..8].copy_from_slice(b"NOTATRCE");
        let err = TraceReader::new(bytes.as_slice()).read_all().unwrap_err();
        assert!(matches!(err, RecorderError::BadMagic(_)));
    }

    #[test]
    fn digest_ignores_header_and_tracks_events() {
        let a = load(&record(&[1, 2, 3]));
        let mut unfinalized = record(&[1, 2, 3]);
        unfinalized[20..24].copy_from_slice(&0u32.to_le_bytes());
        let b = load(&unfinalized);
        let c = load(&record(&[1, 2, 4]));

        assert_eq!(trace_digest(&a), trace_digest(&b));
        assert_ne!(trace_digest(&a), trace_digest(&c));
        assert_eq!(trace_digest(&a).len(), 64);
    }

    #[test]
    fn divergence_points_at_first_difference() {
        let a = load(&record(&[1, 2, 3]));
        let b = load(&record(&[1, 9, 3]));
        let d = first_divergence(&a, &b).unwrap();
        assert_eq!(d.index, 1);
        assert_eq!(d.left.unwrap().address, 2);
        assert_eq!(d.right.unwrap().address, 9);
        assert!(d.to_string().starts_with("event 1: READ"));

        assert!(first_divergence(&a, &a).is_none());
    }

    #[test]
    fn divergence_when_one_trace_is_shorter() {
        let a = load(&record(&[1, 2]));
        let b = load(&record(&[1, 2, 3]));
        let d = first_divergence(&a, &b).unwrap();
        assert_eq!(d.index, 2);
        assert!(d.left.is_none());
        assert!(d.to_string().contains("<end of trace>"));
    }
}
