//! Command-line composition root for vllmd.
//!
//! `main.rs` parses arguments and dispatches to [`handlers`]; everything
//! that wires the runtime and HTTP crates together lives here so it can be
//! tested without spawning the binary.

pub mod handlers;
pub mod logging;
pub mod parser;

pub use parser::{Cli, Commands, ConfigArgs};
