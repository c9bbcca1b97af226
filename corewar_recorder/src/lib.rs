#![forbid(unsafe_code)]

//! CoreWar execution recorders.
//!
//! Two independent recorders borrow host state at instrumentation points:
//!
//! - the trace recorder appends fixed-size binary event records to a file
//!   whose header is finalized at close, for exact replay;
//! - the snapshot recorder streams a JSON document of windowed memory
//!   views, for coarse visualization.
//!
//! Recording never aborts the host. Destinations that cannot be opened
//! disable the recorder; write failures are held and reported at close.

pub mod error;
pub mod trace_format;
pub mod trace_recorder;
pub mod trace_reader;
pub mod memory_window;
pub mod snapshot_types;
pub mod snapshot_recorder;
pub mod config;
pub mod session;

pub use error::{RecorderError, Result};
