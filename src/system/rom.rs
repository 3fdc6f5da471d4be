//! ROM images for the TIOS system.
//!
//! A ROM image is a raw binary file. Up to 32 KiB of it is mapped at
//! address 3, directly after the three I/O ports; RAM follows the ROM.

use std::path::Path;
use thiserror::Error;

/// First ROM address, also the CPU entry point.
pub const ROM_BASE: u16 = 3;

/// Bytes of the image that are mapped.
pub const ROM_SIZE: usize = 32 * 1024;

/// First RAM address. Executing from here on is a fault.
pub const RAM_BASE: u16 = ROM_BASE + ROM_SIZE as u16;

/// A loaded ROM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    bytes: Vec<u8>,
    /// Bytes dropped because the file exceeded [`ROM_SIZE`].
    pub truncated: usize,
}

impl RomImage {
    /// Build an image from raw bytes, keeping at most [`ROM_SIZE`] of them.
    pub fn from_bytes(data: &[u8]) -> Self {
        let kept = data.len().min(ROM_SIZE);
        Self {
            bytes: data[..kept].to_vec(),
            truncated: data.len() - kept,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Load a ROM image from disk.
pub fn load_rom<P: AsRef<Path>>(path: P) -> Result<RomImage, RomError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| RomError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if data.is_empty() {
        return Err(RomError::Empty(path.display().to_string()));
    }

    let rom = RomImage::from_bytes(&data);
    if rom.truncated > 0 {
        tracing::warn!(
            "ROM '{}' is {} bytes; only the first {} are mapped",
            path.display(),
            data.len(),
            ROM_SIZE
        );
    }
    Ok(rom)
}

/// Errors that can occur while loading a ROM.
#[derive(Debug, Clone, Error)]
pub enum RomError {
    #[error("error opening '{path}': {message}")]
    Io { path: String, message: String },

    #[error("ROM '{0}' is empty")]
    Empty(String),
}
