//! NEC16 register file.
//!
//! Sixteen 16-bit registers. A few indices carry fixed roles:
//! - r0: accumulator (convention only)
//! - r1: index register, the address used by `GM`/`SM`
//! - r2: condition result, 0 = true/taken, 1 = false/not taken
//! - r12: stack base (convention only)
//! - r13: stack pointer, grows upward
//! - r15: program counter

use serde::{Serialize, Deserialize};

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// Accumulator register index.
pub const ACCUMULATOR: u8 = 0;
/// Index register used implicitly by `GM` and `SM`.
pub const INDEX: u8 = 1;
/// Condition-result register written by the comparisons.
pub const CONDITION: u8 = 2;
/// Stack base register.
pub const STACK_BASE: u8 = 12;
/// Stack pointer register.
pub const STACK_POINTER: u8 = 13;
/// Program counter register.
pub const PROGRAM_COUNTER: u8 = 15;

/// Conventional entry point; addresses 0-2 are left to the host's I/O map.
pub const ENTRY_POINT: u16 = 3;

/// Condition-result value meaning "true" / "taken".
pub const COND_TRUE: u16 = 0;
/// Condition-result value meaning "false" / "not taken".
pub const COND_FALSE: u16 = 1;

/// The NEC16 register file.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registers {
    regs: [u16; REGISTER_COUNT],
}

impl Registers {
    /// Create a register file with every register zeroed.
    pub const fn new() -> Self {
        Self { regs: [0; REGISTER_COUNT] }
    }

    /// Create a register file from explicit values.
    pub const fn from_array(regs: [u16; REGISTER_COUNT]) -> Self {
        Self { regs }
    }

    /// Create a zeroed register file with the program counter at `entry`.
    pub fn with_entry(entry: u16) -> Self {
        let mut regs = Self::new();
        regs.set_pc(entry);
        regs
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.regs = [0; REGISTER_COUNT];
    }

    /// Read a register. Only the low nibble of `index` is used.
    #[inline]
    pub fn get(&self, index: u8) -> u16 {
        self.regs[(index & 0x0F) as usize]
    }

    /// Write a register. Only the low nibble of `index` is used.
    #[inline]
    pub fn set(&mut self, index: u8, value: u16) {
        self.regs[(index & 0x0F) as usize] = value;
    }

    /// Exchange two registers.
    pub fn swap(&mut self, a: u8, b: u8) {
        self.regs.swap((a & 0x0F) as usize, (b & 0x0F) as usize);
    }

    /// Borrow the raw register array.
    pub fn as_array(&self) -> &[u16; REGISTER_COUNT] {
        &self.regs
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.get(PROGRAM_COUNTER)
    }

    #[inline]
    pub fn set_pc(&mut self, addr: u16) {
        self.set(PROGRAM_COUNTER, addr);
    }

    /// Advance the program counter by `bytes`, wrapping at 64 KiB.
    /// Returns the old value.
    pub fn advance_pc(&mut self, bytes: u16) -> u16 {
        let old = self.pc();
        self.set_pc(old.wrapping_add(bytes));
        old
    }

    #[inline]
    pub fn sp(&self) -> u16 {
        self.get(STACK_POINTER)
    }

    #[inline]
    pub fn set_sp(&mut self, addr: u16) {
        self.set(STACK_POINTER, addr);
    }

    /// Value of the index register.
    #[inline]
    pub fn index(&self) -> u16 {
        self.get(INDEX)
    }

    /// Value of the condition-result register.
    #[inline]
    pub fn condition(&self) -> u16 {
        self.get(CONDITION)
    }

    /// True when the last comparison succeeded.
    #[inline]
    pub fn condition_taken(&self) -> bool {
        self.condition() == COND_TRUE
    }

    /// Store the outcome of a comparison.
    pub fn set_condition(&mut self, taken: bool) {
        self.set(CONDITION, if taken { COND_TRUE } else { COND_FALSE });
    }
}

impl std::fmt::Debug for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.regs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "r{}={:04X}", i, value)?;
        }
        Ok(())
    }
}
