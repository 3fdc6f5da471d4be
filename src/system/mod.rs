//! TIOS reference system for the NEC16.
//!
//! Wraps the CPU core in a memory-mapped I/O bus with an exit port,
//! character input and output, a ROM image and RAM.

pub mod config;
pub mod rom;
pub mod tios;

pub use config::TiosConfig;
pub use rom::{load_rom, RomError, RomImage};
pub use tios::{HarnessError, RunSummary, StopReason, Tios, TiosBus};
