//! Binary trace format (`PMARSREC`).
//!
//! Pure codec layer. No file handling, no state.
//!
//! # File Structure
//!
//! ```text
//! Header (160 bytes)
//!   magic           [u8; 8]   "PMARSREC"
//!   version         u32       1
//!   core_size       u32
//!   total_cycles    u32       host cycle budget
//!   total_events    u32       0 until the recording is closed
//!   warrior1_name   [u8; 64]  NUL padded
//!   warrior2_name   [u8; 64]
//!   warrior1_start  u32
//!   warrior2_start  u32
//! Events (16 bytes each, until end of file)
//!   cycle           u32
//!   address         u16
//!   kind            u16
//!   warrior_id      u8
//!   padding         [u8; 3]   always zero
//!   data            u32
//! ```
//!
//! All integers are little-endian. No compression, no checksums.

use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use corewar_host::state::HostState;

use crate::error::{RecorderError, Result};

pub const MAGIC: [u8; 8] = *b"PMARSREC";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 160;
pub const EVENT_SIZE: usize = 16;
pub const NAME_FIELD_LEN: usize = 64;

/// Bytes every version is guaranteed to share: magic, version, core size,
/// cycle budget, event count.
pub const MINIMAL_HEADER_SIZE: usize = 24;

// ── Event kind ─────────────────────────────────────────────────────

/// Why an event record was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraceEventKind {
    Exec,
    Read,
    Write,
    Dec,
    Inc,
    Spl,
    Dat,
    Die,
    Cycle,
    Push,
    Unknown(u16),
}

impl TraceEventKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => TraceEventKind::Exec,
            1 => TraceEventKind::Read,
            2 => TraceEventKind::Write,
            3 => TraceEventKind::Dec,
            4 => TraceEventKind::Inc,
            5 => TraceEventKind::Spl,
            6 => TraceEventKind::Dat,
            7 => TraceEventKind::Die,
            8 => TraceEventKind::Cycle,
            9 => TraceEventKind::Push,
            other => TraceEventKind::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            TraceEventKind::Exec => 0,
            TraceEventKind::Read => 1,
            TraceEventKind::Write => 2,
            TraceEventKind::Dec => 3,
            TraceEventKind::Inc => 4,
            TraceEventKind::Spl => 5,
            TraceEventKind::Dat => 6,
            TraceEventKind::Die => 7,
            TraceEventKind::Cycle => 8,
            TraceEventKind::Push => 9,
            TraceEventKind::Unknown(raw) => raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TraceEventKind::Exec => "EXEC",
            TraceEventKind::Read => "READ",
            TraceEventKind::Write => "WRITE",
            TraceEventKind::Dec => "DEC",
            TraceEventKind::Inc => "INC",
            TraceEventKind::Spl => "SPL",
            TraceEventKind::Dat => "DAT",
            TraceEventKind::Die => "DIE",
            TraceEventKind::Cycle => "CYCLE",
            TraceEventKind::Push => "PUSH",
            TraceEventKind::Unknown(_) => "UNKNOWN",
        }
    }
}

// ── Header ─────────────────────────────────────────────────────────

/// Name and load address of one of the first two warriors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub start: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHeader {
    pub version: u32,
    pub core_size: u32,
    pub total_cycles: u32,
    /// Authoritative only once the recording has been closed.
    pub total_events: u32,
    /// `None` when decoded from a version whose layout past the minimal
    /// field set is not known.
    pub participants: Option<[Participant; 2]>,
}

impl TraceHeader {
    /// Placeholder header for a new recording: event count zero.
    pub fn from_host(host: &HostState) -> Self {
        let participant = |idx: usize| {
            host.warriors
                .get(idx)
                .map(|w| Participant {
                    name: w
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("Warrior{}", idx + 1)),
                    start: w.position,
                })
                .unwrap_or_default()
        };

        Self {
            version: FORMAT_VERSION,
            core_size: host.core_size(),
            total_cycles: host.max_cycles,
            total_events: 0,
            participants: Some([participant(0), participant(1)]),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&MAGIC);
        LittleEndian::write_u32(&mut buf[8..12], self.version);
        LittleEndian::write_u32(&mut buf[12..16], self.core_size);
        LittleEndian::write_u32(&mut buf[16..20], self.total_cycles);
        LittleEndian::write_u32(&mut buf[20..24], self.total_events);

        // Unknown layouts leave the participant block zeroed.
        if let Some([first, second]) = &self.participants {
            buf[24..88].copy_from_slice(&encode_name(&first.name));
            buf[88..152].copy_from_slice(&encode_name(&second.name));
            LittleEndian::write_u32(&mut buf[152..156], first.start);
            LittleEndian::write_u32(&mut buf[156..160], second.start);
        }
        buf
    }

    /// Decode a header. Rejects a wrong magic tag; tolerates unknown
    /// versions by reading only the minimal field set.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MINIMAL_HEADER_SIZE {
            return Err(RecorderError::Truncated {
                what: "header",
                expected: MINIMAL_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut reader = bytes;
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(RecorderError::BadMagic(magic));
        }

        let version = reader.read_u32::<LittleEndian>()?;
        let core_size = reader.read_u32::<LittleEndian>()?;
        let total_cycles = reader.read_u32::<LittleEndian>()?;
        let total_events = reader.read_u32::<LittleEndian>()?;

        let participants = if version == FORMAT_VERSION {
            if bytes.len() < HEADER_SIZE {
                return Err(RecorderError::Truncated {
                    what: "header",
                    expected: HEADER_SIZE,
                    actual: bytes.len(),
                });
            }
            let mut names = [[0u8; NAME_FIELD_LEN]; 2];
            reader.read_exact(&mut names[0])?;
            reader.read_exact(&mut names[1])?;
            let start1 = reader.read_u32::<LittleEndian>()?;
            let start2 = reader.read_u32::<LittleEndian>()?;
            Some([
                Participant { name: decode_name(&names[0]), start: start1 },
                Participant { name: decode_name(&names[1]), start: start2 },
            ])
        } else {
            None
        };

        Ok(Self {
            version,
            core_size,
            total_cycles,
            total_events,
            participants,
        })
    }
}

/// At most `NAME_FIELD_LEN - 1` bytes of text, cut on a char boundary,
/// always NUL terminated.
fn encode_name(name: &str) -> [u8; NAME_FIELD_LEN] {
    let mut field = [0u8; NAME_FIELD_LEN];
    let mut end = name.len().min(NAME_FIELD_LEN - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&name.as_bytes()[..end]);
    field
}

fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

// ── Event record ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    pub cycle: u32,
    pub address: u16,
    pub kind: TraceEventKind,
    pub warrior_id: u8,
    pub data: u32,
}

impl TraceEvent {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    pub fn encode(&self) -> [u8; EVENT_SIZE] {
        let mut buf = [0u8; EVENT_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.cycle);
        LittleEndian::write_u16(&mut buf[4..6], self.address);
        LittleEndian::write_u16(&mut buf[6..8], self.kind.code());
        buf[8] = self.warrior_id;
        // buf[9..12] is padding and stays zero
        LittleEndian::write_u32(&mut buf[12..16], self.data);
        buf
    }

    pub fn decode(bytes: &[u8; EVENT_SIZE]) -> Self {
        Self {
            cycle: LittleEndian::read_u32(&bytes[0..4]),
            address: LittleEndian::read_u16(&bytes[4..6]),
            kind: TraceEventKind::from_code(LittleEndian::read_u16(&bytes[6..8])),
            warrior_id: bytes[8],
            data: LittleEndian::read_u32(&bytes[12..16]),
        }
    }
}
