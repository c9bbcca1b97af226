//! Instruction encoding as stored in a core cell.
//!
//! The host stores opcodes, modifiers and addressing modes as small raw
//! integers. Every code the recorders may meet maps onto a named variant;
//! anything else is carried verbatim in an `Unknown` variant and prints as
//! the `"UNKNOWN"` sentinel instead of failing.

use serde::{Serialize, Serializer};

/// Name emitted for any code outside the known tables.
pub const UNKNOWN_NAME: &str = "UNKNOWN";

// ── Opcode ─────────────────────────────────────────────────────────

/// Redcode operation, in pMARS numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Opcode {
    Mov,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Jmz,
    Jmn,
    Djn,
    Cmp,
    Slt,
    Spl,
    #[default]
    Dat,
    Jmp,
    Seq,
    Sne,
    Nop,
    Ldp,
    Stp,
    Unknown(u8),
}

impl Opcode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Opcode::Mov,
            1 => Opcode::Add,
            2 => Opcode::Sub,
            3 => Opcode::Mul,
            4 => Opcode::Div,
            5 => Opcode::Mod,
            6 => Opcode::Jmz,
            7 => Opcode::Jmn,
            8 => Opcode::Djn,
            9 => Opcode::Cmp,
            10 => Opcode::Slt,
            11 => Opcode::Spl,
            12 => Opcode::Dat,
            13 => Opcode::Jmp,
            14 => Opcode::Seq,
            15 => Opcode::Sne,
            16 => Opcode::Nop,
            17 => Opcode::Ldp,
            18 => Opcode::Stp,
            other => Opcode::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Opcode::Mov => 0,
            Opcode::Add => 1,
            Opcode::Sub => 2,
            Opcode::Mul => 3,
            Opcode::Div => 4,
            Opcode::Mod => 5,
            Opcode::Jmz => 6,
            Opcode::Jmn => 7,
            Opcode::Djn => 8,
            Opcode::Cmp => 9,
            Opcode::Slt => 10,
            Opcode::Spl => 11,
            Opcode::Dat => 12,
            Opcode::Jmp => 13,
            Opcode::Seq => 14,
            Opcode::Sne => 15,
            Opcode::Nop => 16,
            Opcode::Ldp => 17,
            Opcode::Stp => 18,
            Opcode::Unknown(raw) => raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Jmz => "JMZ",
            Opcode::Jmn => "JMN",
            Opcode::Djn => "DJN",
            Opcode::Cmp => "CMP",
            Opcode::Slt => "SLT",
            Opcode::Spl => "SPL",
            Opcode::Dat => "DAT",
            Opcode::Jmp => "JMP",
            Opcode::Seq => "SEQ",
            Opcode::Sne => "SNE",
            Opcode::Nop => "NOP",
            Opcode::Ldp => "LDP",
            Opcode::Stp => "STP",
            Opcode::Unknown(_) => UNKNOWN_NAME,
        }
    }
}

// ── Modifier ───────────────────────────────────────────────────────

/// Instruction modifier (`.A`, `.B`, ... `.I`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Modifier {
    A,
    B,
    AB,
    BA,
    #[default]
    F,
    X,
    I,
    Unknown(u8),
}

impl Modifier {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Modifier::A,
            1 => Modifier::B,
            2 => Modifier::AB,
            3 => Modifier::BA,
            4 => Modifier::F,
            5 => Modifier::X,
            6 => Modifier::I,
            other => Modifier::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Modifier::A => 0,
            Modifier::B => 1,
            Modifier::AB => 2,
            Modifier::BA => 3,
            Modifier::F => 4,
            Modifier::X => 5,
            Modifier::I => 6,
            Modifier::Unknown(raw) => raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modifier::A => "A",
            Modifier::B => "B",
            Modifier::AB => "AB",
            Modifier::BA => "BA",
            Modifier::F => "F",
            Modifier::X => "X",
            Modifier::I => "I",
            Modifier::Unknown(_) => UNKNOWN_NAME,
        }
    }
}

// ── Addressing mode ────────────────────────────────────────────────

/// Operand addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddrMode {
    Immediate,
    #[default]
    Direct,
    Indirect,
    PreDecrement,
    PostIncrement,
    Unknown(u8),
}

impl AddrMode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => AddrMode::Immediate,
            1 => AddrMode::Direct,
            2 => AddrMode::Indirect,
            3 => AddrMode::PreDecrement,
            4 => AddrMode::PostIncrement,
            other => AddrMode::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            AddrMode::Immediate => 0,
            AddrMode::Direct => 1,
            AddrMode::Indirect => 2,
            AddrMode::PreDecrement => 3,
            AddrMode::PostIncrement => 4,
            AddrMode::Unknown(raw) => raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AddrMode::Immediate => "IMMEDIATE",
            AddrMode::Direct => "DIRECT",
            AddrMode::Indirect => "INDIRECT",
            AddrMode::PreDecrement => "PREDECR",
            AddrMode::PostIncrement => "POSTINC",
            AddrMode::Unknown(_) => UNKNOWN_NAME,
        }
    }
}

// Serialized by name so JSON consumers never see raw codes.

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl Serialize for Modifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl Serialize for AddrMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ── Cell ───────────────────────────────────────────────────────────

/// One addressable unit of core memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub opcode: Opcode,
    pub modifier: Modifier,
    pub a_mode: AddrMode,
    pub a_value: u32,
    pub b_mode: AddrMode,
    pub b_value: u32,
    /// 1-based index of the warrior that last wrote this cell, 0 if none.
    pub debug_info: u32,
}

impl Cell {
    pub fn new(opcode: Opcode, a_mode: AddrMode, a_value: u32, b_mode: AddrMode, b_value: u32) -> Self {
        Self {
            opcode,
            modifier: Modifier::default(),
            a_mode,
            a_value,
            b_mode,
            b_value,
            debug_info: 0,
        }
    }

    /// Builder-style ownership annotation (1-based, as the host stores it).
    pub fn owned_by(mut self, debug_info: u32) -> Self {
        self.debug_info = debug_info;
        self
    }

    /// 0-based owning warrior, or -1 when the annotation is absent or
    /// does not name one of `warrior_count` warriors.
    pub fn owner(&self, warrior_count: usize) -> i32 {
        if self.debug_info > 0 && (self.debug_info as usize) <= warrior_count {
            self.debug_info as i32 - 1
        } else {
            -1
        }
    }
}
