//! Host events: the instrumentation points the simulator fires.
//!
//! Events are pure data. They name a state transition the host has
//! already performed and carry only what the host knows at the call
//! site. Observers read everything else from the borrowed `HostState`.
//!
//! Firing rules for hosts:
//!   - `Write`, `Dec`, `Inc` fire after the cell was mutated
//!   - `Exec` fires before the program counter advances
//!   - `Cycle` fires once at every cycle boundary

use crate::state::HostState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Instruction at `address` is executing.
    Exec { address: u32 },
    /// Cell at `address` was read.
    Read { address: u32 },
    /// Cell at `address` was written.
    Write { address: u32 },
    /// Cell at `address` was decremented.
    Dec { address: u32 },
    /// Cell at `address` was incremented.
    Inc { address: u32 },
    /// Warrior spawned a task; `tasks` is its new task count.
    Spl { warrior_id: u8, tasks: u32 },
    /// A task of `warrior_id` died executing `address`.
    Dat { address: u32, warrior_id: u8, tasks: u32 },
    /// Warrior lost its last task.
    Die { warrior_id: u8 },
    /// Cycle boundary.
    Cycle,
    /// `value` was pushed on the task queue.
    Push { value: u32 },
}

/// Anything that listens to host events: recorders, display back-ends.
///
/// Observers are independent of each other; the host fans events out to
/// whichever it has attached.
pub trait HostObserver {
    fn on_event(&mut self, host: &HostState, event: &HostEvent);
}
