//! CPU emulation for the NEC16.
//!
//! This module implements the complete NEC16 core:
//! - 16 sixteen-bit registers (accumulator, index, condition, stack, PC)
//! - A 64 KiB address space reached only through a fallible [`Bus`]
//! - 16 primary opcodes, an extended group and a stack/memory group

pub mod bus;
pub mod registers;
pub mod decode;
pub mod execute;

pub use bus::{Bus, BusError, FlatMemory};
pub use registers::Registers;
pub use decode::{decode, Instruction, Opcode, ExtOp, StackOp};
pub use execute::{Cpu, CpuError, CpuState, ErrorCode};
