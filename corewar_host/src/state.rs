//! Host state as exposed to the recorders.
//!
//! The simulator fills this in and lends it, read-only, to every hook
//! call. Recorders never hold on to it between calls.

use crate::instruction::Cell;

/// A participant program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warrior {
    pub name: Option<String>,
    pub author: Option<String>,
    /// Load address of the first instruction.
    pub position: u32,
    /// Program length in instructions.
    pub length: u32,
    /// Live task count; zero means the warrior is dead.
    pub tasks: u32,
}

impl Warrior {
    pub fn new(name: &str, position: u32, length: u32) -> Self {
        Self {
            name: Some(name.to_string()),
            author: None,
            position,
            length,
            tasks: 1,
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn is_alive(&self) -> bool {
        self.tasks > 0
    }
}

/// Everything the recorders read from the simulator.
#[derive(Debug, Clone)]
pub struct HostState {
    pub core: Vec<Cell>,
    pub warriors: Vec<Warrior>,
    /// Cycle budget per round.
    pub max_cycles: u32,
    /// Number of rounds in the battle.
    pub rounds: u32,
    /// Current round.
    pub round: u32,
    /// Current cycle counter.
    pub cycle: u32,
    /// Index of the currently scheduled warrior, if any.
    pub current: Option<usize>,
    /// Program counter of the task about to execute.
    pub pc: u32,
    pub warriors_left: u32,
}

impl HostState {
    /// A freshly loaded core: every cell `DAT.F $0, $0`, round 1, cycle 0,
    /// first warrior scheduled at its load address.
    pub fn new(core_size: u32, warriors: Vec<Warrior>) -> Self {
        let pc = warriors.first().map(|w| w.position).unwrap_or(0);
        let current = if warriors.is_empty() { None } else { Some(0) };
        let warriors_left = warriors.iter().filter(|w| w.is_alive()).count() as u32;
        Self {
            core: vec![Cell::default(); core_size as usize],
            warriors,
            max_cycles: 80_000,
            rounds: 1,
            round: 1,
            cycle: 0,
            current,
            pc,
            warriors_left,
        }
    }

    pub fn with_limits(mut self, max_cycles: u32, rounds: u32) -> Self {
        self.max_cycles = max_cycles;
        self.rounds = rounds;
        self
    }

    pub fn core_size(&self) -> u32 {
        self.core.len() as u32
    }

    pub fn cell(&self, address: u32) -> Option<&Cell> {
        self.core.get(address as usize)
    }

    /// The currently scheduled warrior.
    pub fn current_warrior(&self) -> Option<&Warrior> {
        self.current.and_then(|idx| self.warriors.get(idx))
    }

    /// Index of the scheduled warrior as recorded in trace events
    /// (0 when nothing is scheduled).
    pub fn current_warrior_id(&self) -> u8 {
        self.current.map(|idx| idx as u8).unwrap_or(0)
    }

    /// Load a program into core starting at `position`, tagging each cell
    /// with the 1-based owner annotation of `warrior_id`.
    pub fn load(&mut self, warrior_id: usize, position: u32, program: &[Cell]) {
        let core_size = self.core_size();
        if core_size == 0 {
            return;
        }
        for (offset, cell) in program.iter().enumerate() {
            let addr = ((position as u64 + offset as u64) % core_size as u64) as usize;
            self.core[addr] = cell.owned_by(warrior_id as u32 + 1);
        }
    }
}
