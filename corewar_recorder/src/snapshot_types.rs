//! Serializable shapes of the snapshot document.
//!
//! Field order is the wire order; `serde_json` is built with
//! `preserve_order` and structs serialize in declaration order.

use serde::Serialize;

use corewar_host::instruction::{AddrMode, Cell, Modifier, Opcode};
use corewar_host::state::{HostState, Warrior};

const UNKNOWN_LABEL: &str = "Unknown";

// ── Document header ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SimulationInfo {
    pub core_size: u32,
    pub warriors: u32,
    pub max_cycles: u32,
    pub rounds: u32,
}

impl SimulationInfo {
    pub fn from_host(host: &HostState) -> Self {
        Self {
            core_size: host.core_size(),
            warriors: host.warriors.len() as u32,
            max_cycles: host.max_cycles,
            rounds: host.rounds,
        }
    }
}

/// Static per-warrior descriptor, written once at open.
#[derive(Debug, Clone, Serialize)]
pub struct WarriorInfo {
    pub id: u32,
    pub name: String,
    pub author: String,
    pub position: u32,
    pub length: u32,
}

impl WarriorInfo {
    pub fn from_warrior(id: usize, warrior: &Warrior) -> Self {
        Self {
            id: id as u32,
            name: label(&warrior.name),
            author: label(&warrior.author),
            position: warrior.position,
            length: warrior.length,
        }
    }
}

// ── Per-step entries ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CurrentWarrior {
    pub id: u32,
    pub name: String,
    pub pc: u32,
    pub tasks: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentInstruction {
    pub address: u32,
    pub opcode: Opcode,
    pub modifier: Modifier,
    pub a_mode: AddrMode,
    pub a_value: u32,
    pub b_mode: AddrMode,
    pub b_value: u32,
}

/// Liveness row for one warrior.
#[derive(Debug, Clone, Serialize)]
pub struct WarriorStatus {
    pub id: u32,
    pub tasks: u32,
    pub position: u32,
    pub alive: bool,
}

/// One sampled core cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryEntry {
    pub address: u32,
    pub opcode: Opcode,
    pub a_mode: AddrMode,
    pub a_value: u32,
    pub b_mode: AddrMode,
    pub b_value: u32,
    /// 0-based owning warrior, -1 when unowned.
    pub owner: i32,
}

impl MemoryEntry {
    pub fn from_cell(address: u32, cell: &Cell, warrior_count: usize) -> Self {
        Self {
            address,
            opcode: cell.opcode,
            a_mode: cell.a_mode,
            a_value: cell.a_value,
            b_mode: cell.b_mode,
            b_value: cell.b_value,
            owner: cell.owner(warrior_count),
        }
    }
}

/// One element of `execution_steps` produced by a windowed record.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: u64,
    pub round: u32,
    pub cycle: u32,
    pub warriors_left: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_warrior: Option<CurrentWarrior>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_instruction: Option<CurrentInstruction>,
    pub warrior_states: Vec<WarriorStatus>,
    pub memory_changes: Vec<MemoryEntry>,
}

impl StepRecord {
    /// Everything but the memory sample, which the caller supplies.
    pub fn from_host(step: u64, host: &HostState, memory_changes: Vec<MemoryEntry>) -> Self {
        let current_warrior = host.current.and_then(|idx| {
            host.warriors.get(idx).map(|w| CurrentWarrior {
                id: idx as u32,
                name: label(&w.name),
                pc: host.pc,
                tasks: w.tasks,
            })
        });

        let current_instruction = host.cell(host.pc).map(|cell| CurrentInstruction {
            address: host.pc,
            opcode: cell.opcode,
            modifier: cell.modifier,
            a_mode: cell.a_mode,
            a_value: cell.a_value,
            b_mode: cell.b_mode,
            b_value: cell.b_value,
        });

        let warrior_states = host
            .warriors
            .iter()
            .enumerate()
            .map(|(id, w)| WarriorStatus {
                id: id as u32,
                tasks: w.tasks,
                position: w.position,
                alive: w.is_alive(),
            })
            .collect();

        Self {
            step,
            round: host.round,
            cycle: host.cycle,
            warriors_left: host.warriors_left,
            current_warrior,
            current_instruction,
            warrior_states,
            memory_changes,
        }
    }
}

/// One element of `execution_steps` produced by a full-core dump.
#[derive(Debug, Clone, Serialize)]
pub struct FullMemoryRecord {
    pub step: u64,
    pub round: u32,
    pub cycle: u32,
    pub full_memory: Vec<MemoryEntry>,
}

fn label(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn step_record_key_order() {
        let host = HostState::new(16, vec![Warrior::new("Imp", 0, 1)]);
        let record = StepRecord::from_host(0, &host, Vec::new());
        let value: Value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "step",
                "round",
                "cycle",
                "warriors_left",
                "current_warrior",
                "current_instruction",
                "warrior_states",
                "memory_changes",
            ]
        );
    }

    #[test]
    fn optional_sections_are_omitted() {
        let mut host = HostState::new(16, Vec::new());
        host.pc = 99;
        let value = serde_json::to_value(StepRecord::from_host(3, &host, Vec::new())).unwrap();
        assert!(value.get("current_warrior").is_none());
        assert!(value.get("current_instruction").is_none());
        assert_eq!(value["step"], 3);
    }

    #[test]
    fn missing_labels_become_unknown() {
        let warrior = Warrior {
            position: 5,
            length: 2,
            ..Warrior::default()
        };
        let info = WarriorInfo::from_warrior(1, &warrior);
        assert_eq!(info.name, "Unknown");
        assert_eq!(info.author, "Unknown");
    }

    #[test]
    fn memory_entry_uses_symbolic_names() {
        let cell = Cell::new(Opcode::from_code(99), AddrMode::from_code(9), 1, AddrMode::Immediate, 2)
            .owned_by(1);
        let value = serde_json::to_value(MemoryEntry::from_cell(7, &cell, 2)).unwrap();
        assert_eq!(value["opcode"], "UNKNOWN");
        assert_eq!(value["a_mode"], "UNKNOWN");
        assert_eq!(value["b_mode"], "IMMEDIATE");
        assert_eq!(value["owner"], 0);
    }
}
