//! # NEC16 Emulator
//!
//! An instruction-level emulator for the NEC16, a 16-bit CPU with sixteen
//! registers and a 64 KiB byte-addressed space reached only through a
//! host-supplied bus.
//!
//! The [`cpu`] module is the core: decoder, opcode semantics and step
//! driver. The [`system`] module is TIOS, a reference machine that maps
//! character I/O and an exit port into the low addresses and runs a ROM.

pub mod cpu;
pub mod system;

// Re-export commonly used types
pub use cpu::{Bus, BusError, Cpu, CpuError, CpuState, ErrorCode, FlatMemory, Instruction, Opcode, Registers};
pub use system::{load_rom, RomImage, Tios, TiosConfig};
