//! TIOS, the reference I/O system for the NEC16.
//!
//! Address map:
//! - 0: exit strobe (write stops the machine, read is invalid)
//! - 1: character input (read takes one byte from the host, write is invalid)
//! - 2: character output (write emits one byte, read is invalid)
//! - 3..: 32 KiB ROM, then RAM up to 0xFFFF

use std::io::{Read, Write};

use crate::cpu::{Bus, BusError, Cpu, CpuError, ErrorCode, Registers};
use crate::system::config::TiosConfig;
use crate::system::rom::{RomImage, RAM_BASE, ROM_BASE};
use serde::{Serialize, Deserialize};
use thiserror::Error;

pub const EXIT_PORT: u16 = 0;
pub const INPUT_PORT: u16 = 1;
pub const OUTPUT_PORT: u16 = 2;

/// Bytes backing addresses `ROM_BASE..=0xFFFF`.
const STORE_SIZE: usize = 0x1_0000 - ROM_BASE as usize;

/// The TIOS memory map as seen by the CPU.
pub struct TiosBus<R, W> {
    memory: Box<[u8]>,
    exit_requested: bool,
    input: R,
    output: W,
    trace: bool,
}

impl<R: Read, W: Write> TiosBus<R, W> {
    /// Create a bus with `rom` mapped at [`ROM_BASE`] and zeroed RAM.
    pub fn new(rom: &RomImage, input: R, output: W, trace: bool) -> Self {
        let mut memory = vec![0u8; STORE_SIZE].into_boxed_slice();
        memory[..rom.len()].copy_from_slice(rom.bytes());

        Self {
            memory,
            exit_requested: false,
            input,
            output,
            trace,
        }
    }

    /// True once the program has written to the exit port.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Read the backing store directly. Ports read as zero.
    pub fn peek(&self, addr: u16) -> u8 {
        if addr < ROM_BASE {
            return 0;
        }
        self.memory[(addr - ROM_BASE) as usize]
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_input(&mut self) -> Result<u8, BusError> {
        let mut byte = [0u8; 1];
        match self.input.read_exact(&mut byte) {
            Ok(()) => Ok(byte[0]),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(BusError::Unknown("end of input".into()))
            }
            Err(e) => Err(BusError::Unknown(format!("input: {}", e))),
        }
    }

    fn write_output(&mut self, value: u8) -> Result<(), BusError> {
        self.output
            .write_all(&[value])
            .and_then(|()| self.output.flush())
            .map_err(|e| BusError::Unknown(format!("output: {}", e)))
    }
}

impl<R: Read, W: Write> Bus for TiosBus<R, W> {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        if self.trace {
            tracing::debug!("[READ_REQ] addr:{:04X}", addr);
        }

        match addr {
            EXIT_PORT | OUTPUT_PORT => Err(BusError::AddressInvalid { addr }),
            INPUT_PORT => self.read_input(),
            _ => {
                let byte = self.memory[(addr - ROM_BASE) as usize];
                if self.trace {
                    tracing::debug!("[READ_REQ] byte:{:02X}", byte);
                }
                Ok(byte)
            }
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        if self.trace {
            tracing::debug!("[WRITE_REQ] addr:{:04X} byte:{:02X}", addr, value);
        }

        match addr {
            EXIT_PORT => {
                self.exit_requested = true;
                Ok(())
            }
            INPUT_PORT => Err(BusError::AddressInvalid { addr }),
            OUTPUT_PORT => self.write_output(value),
            _ => {
                self.memory[(addr - ROM_BASE) as usize] = value;
                Ok(())
            }
        }
    }
}

/// Why a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The program wrote to the exit port.
    ExitStrobe,
    /// The configured instruction limit was reached.
    InstructionLimit,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub instructions: u64,
    pub stop: StopReason,
    pub registers: Registers,
}

/// A complete TIOS machine: CPU, memory map and run policy.
pub struct Tios<R, W> {
    cpu: Cpu<TiosBus<R, W>>,
    config: TiosConfig,
    executed: u64,
}

impl<R: Read, W: Write> Tios<R, W> {
    /// Build a machine with `rom` loaded and the CPU at the entry point.
    pub fn new(rom: &RomImage, input: R, output: W, config: TiosConfig) -> Self {
        let bus = TiosBus::new(rom, input, output, config.trace);
        Self {
            cpu: Cpu::with_registers(bus, Registers::with_entry(ROM_BASE)),
            config,
            executed: 0,
        }
    }

    pub fn cpu(&self) -> &Cpu<TiosBus<R, W>> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu<TiosBus<R, W>> {
        &mut self.cpu
    }

    pub fn config(&self) -> &TiosConfig {
        &self.config
    }

    /// Instructions executed so far.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Run until the exit strobe, the instruction limit, or an error.
    ///
    /// Every failed step is fatal for the run.
    pub fn run(&mut self) -> Result<RunSummary, HarnessError> {
        loop {
            if self.cpu.bus().exit_requested() {
                return Ok(self.summary(StopReason::ExitStrobe));
            }
            if let Some(limit) = self.config.instruction_limit {
                if self.executed >= limit {
                    return Ok(self.summary(StopReason::InstructionLimit));
                }
            }

            let pc = self.cpu.regs.pc();
            if let Err(source) = self.cpu.step() {
                tracing::debug!("step failed at {:04X}: {}", pc, source);
                return Err(HarnessError::Step { pc, source });
            }
            self.executed += 1;

            let next = self.cpu.regs.pc();
            if next >= RAM_BASE {
                return Err(HarnessError::ExecuteFromRam { pc: next });
            }
        }
    }

    fn summary(&self, stop: StopReason) -> RunSummary {
        tracing::debug!("stopped after {} instructions: {:?}", self.executed, stop);
        RunSummary {
            instructions: self.executed,
            stop,
            registers: self.cpu.regs,
        }
    }
}

/// Errors that end a TIOS run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("received error code at {pc:#06X}, '{}': {source}", .source.code())]
    Step { pc: u16, source: CpuError },

    #[error("attempted to execute code from RAM (pc {pc:#06X})")]
    ExecuteFromRam { pc: u16 },
}

impl HarnessError {
    /// Flat error code for step failures.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            HarnessError::Step { source, .. } => Some(source.code()),
            HarnessError::ExecuteFromRam { .. } => None,
        }
    }
}
