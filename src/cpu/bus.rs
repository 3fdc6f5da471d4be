//! NEC16 bus interface.
//!
//! The CPU owns no memory. Every load, store, instruction fetch and stack
//! access is a byte transaction on a host-supplied [`Bus`], and any of them
//! may be rejected.

use thiserror::Error;

/// Size of the NEC16 address space in bytes.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// Byte-addressed, fallible memory/IO bus.
///
/// `read` takes `&mut self` because reads may have side effects (for
/// example consuming a character from an input port).
pub trait Bus {
    /// Read one byte.
    fn read(&mut self, addr: u16) -> Result<u8, BusError>;

    /// Write one byte.
    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError>;

    /// Read a little-endian 16-bit value from `addr` and `addr + 1`.
    fn read_u16(&mut self, addr: u16) -> Result<u16, BusError> {
        let lo = self.read(addr)?;
        let hi = self.read(addr.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Write a little-endian 16-bit value to `addr` and `addr + 1`.
    fn write_u16(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo)?;
        self.write(addr.wrapping_add(1), hi)
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        (**self).write(addr, value)
    }
}

/// Errors a bus implementation may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The address is not mapped for this kind of access.
    #[error("address invalid: {addr:#06X}")]
    AddressInvalid { addr: u16 },

    /// Host-defined failure.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Flat 64 KiB RAM where every address is readable and writable.
#[derive(Clone)]
pub struct FlatMemory {
    bytes: Box<[u8]>,
}

impl FlatMemory {
    /// Create a zero-filled memory.
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; ADDRESS_SPACE].into_boxed_slice(),
        }
    }

    /// Copy `data` into memory starting at `start`, wrapping past 0xFFFF.
    pub fn load(&mut self, start: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            let addr = start.wrapping_add(i as u16);
            self.bytes[addr as usize] = byte;
        }
    }

    /// Read a byte without going through the bus contract.
    pub fn peek(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    /// Little-endian 16-bit peek.
    pub fn peek_u16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.peek(addr), self.peek(addr.wrapping_add(1))])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FlatMemory {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        Ok(self.bytes[addr as usize])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.bytes[addr as usize] = value;
        Ok(())
    }
}

impl std::fmt::Debug for FlatMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.bytes.iter().filter(|&&b| b != 0).count();

        f.debug_struct("FlatMemory")
            .field("non_zero_bytes", &non_zero)
            .field("total_bytes", &ADDRESS_SPACE)
            .finish()
    }
}
