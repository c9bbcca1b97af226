#![forbid(unsafe_code)]

//! CoreWar host model.
//!
//! The simulator owns memory, the warrior table and the cycle/round
//! counters. This crate describes that state as the recorders see it:
//! borrowed, read-only, for the duration of one hook call.
//!
//! No execution semantics live here.

/// Core size used by the standard '94 hill and the default pMARS build.
pub const DEFAULT_CORE_SIZE: u32 = 8000;

pub mod arithmetic;
pub mod instruction;
pub mod state;
pub mod events;
