//! CPU execution engine for the NEC16.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::bus::{Bus, BusError};
use crate::cpu::decode::{self, ExtOp, Instruction, Opcode, StackOp};
use crate::cpu::registers::Registers;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Program counter value from which no instruction can be fetched.
pub const HALT_SENTINEL: u16 = 0xFFFF;

/// Step driver state, derived from the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// An instruction can be fetched.
    Ready,
    /// The program counter sits on the sentinel; every step fails.
    HaltedInvalid,
}

/// The NEC16 CPU: a register file plus the bus it drives.
pub struct Cpu<B> {
    /// CPU registers.
    pub regs: Registers,
    bus: B,
}

impl<B: Bus> Cpu<B> {
    /// Create a CPU with zeroed registers except the program counter,
    /// which starts at [`ENTRY_POINT`](crate::cpu::registers::ENTRY_POINT).
    pub fn new(bus: B) -> Self {
        Self::with_registers(bus, Registers::with_entry(crate::cpu::registers::ENTRY_POINT))
    }

    /// Create a CPU with a host-supplied initial register file.
    pub fn with_registers(bus: B, regs: Registers) -> Self {
        Self { regs, bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Tear the CPU down and hand the bus back to the host.
    pub fn into_bus(self) -> B {
        self.bus
    }

    pub fn state(&self) -> CpuState {
        if self.regs.pc() == HALT_SENTINEL {
            CpuState::HaltedInvalid
        } else {
            CpuState::Ready
        }
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. A failure
    /// leaves registers as they were before the failing bus call; bus
    /// writes already issued by the instruction are not undone.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        let pc = self.regs.pc();
        if pc == HALT_SENTINEL {
            return Err(CpuError::InstructionInvalid { pc });
        }

        // Fetch
        let byte0 = self.bus.read(pc)?;
        let byte1 = self.bus.read(pc.wrapping_add(1))?;

        // Decode
        let instr = decode::decode(byte0, byte1);
        tracing::trace!("{:04X}: {:02X} {:02X} {}", pc, byte0, byte1, instr.opcode.mnemonic());

        // Advance PC before execute (jumps and operand fetches build on it)
        self.regs.advance_pc(2);

        // Execute
        self.execute(instr)?;

        Ok(instr)
    }

    /// Run for at most `max_steps` instructions.
    ///
    /// Returns the number of instructions executed. Stops at the first
    /// failing step.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        let mut executed = 0;
        while executed < max_steps {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Execute a decoded primary instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), CpuError> {
        let a = instr.reg_a;
        let b = instr.reg_b;

        match instr.opcode {
            Opcode::Eops => return self.execute_ext(instr),

            Opcode::Jmp => {
                if self.regs.condition_taken() {
                    let target = self.regs.get(a);
                    self.regs.set_pc(target);
                }
            }

            // ==================== Memory ====================

            Opcode::Gm => {
                let byte = self.bus.read(self.regs.index())?;
                self.regs.set(a, byte as u16);
            }

            Opcode::Sm => {
                let byte = (self.regs.get(a) & 0xFF) as u8;
                self.bus.write(self.regs.index(), byte)?;
            }

            // ==================== Logic ====================

            Opcode::Or => self.alu(a, instr.imm & 0xFF, |x, y| x | y),
            Opcode::Orr => self.alu_rr(a, b, |x, y| x | y),
            Opcode::And => self.alu_rr(a, b, |x, y| x & y),
            Opcode::Xor => self.alu_rr(a, b, |x, y| x ^ y),
            Opcode::Not => self.alu(a, 0, |x, _| !x),
            Opcode::Shl => self.alu_rr(a, b, shift_left),
            Opcode::Shr => self.alu_rr(a, b, shift_right),

            // ==================== Arithmetic ====================

            Opcode::Add => self.alu_rr(a, b, u16::wrapping_add),
            Opcode::Sub => self.alu_rr(a, b, u16::wrapping_sub),
            Opcode::Mul => self.alu_rr(a, b, u16::wrapping_mul),

            Opcode::Div | Opcode::Mod => {
                let dividend = self.regs.get(a);
                let divisor = self.regs.get(b);
                let result = if instr.opcode == Opcode::Div {
                    dividend.checked_div(divisor)
                } else {
                    dividend.checked_rem(divisor)
                };
                match result {
                    Some(value) => self.regs.set(a, value),
                    None => return Err(CpuError::ArithmeticFault { op: instr.opcode }),
                }
            }
        }

        Ok(())
    }

    /// Execute an extended-group instruction (primary opcode 0).
    fn execute_ext(&mut self, instr: Instruction) -> Result<(), CpuError> {
        let b = instr.reg_b;
        let rb = instr.real_reg_b();

        match instr.ext_op() {
            ExtOp::Nop | ExtOp::Reserved(_) => {}

            // ==================== Comparisons ====================

            ExtOp::CmpEq => {
                let taken = self.regs.get(b) == self.regs.get(rb);
                self.regs.set_condition(taken);
            }

            ExtOp::CmpGt => {
                let taken = self.regs.get(b) > self.regs.get(rb);
                self.regs.set_condition(taken);
            }

            ExtOp::CmpLt => {
                let taken = self.regs.get(b) < self.regs.get(rb);
                self.regs.set_condition(taken);
            }

            // ==================== Immediate / Control Flow ====================

            ExtOp::LoadImm => {
                let value = self.fetch_operand()?;
                self.regs.set(b, value);
                self.regs.advance_pc(2);
            }

            ExtOp::JmpImm => {
                let target = self.fetch_operand()?;
                if self.regs.condition_taken() {
                    self.regs.set_pc(target);
                } else {
                    self.regs.advance_pc(2);
                }
            }

            ExtOp::Ujmp => {
                let target = self.fetch_operand()?;
                self.regs.set_pc(target);
            }

            // ==================== Register Transfer ====================

            ExtOp::Copy => {
                let value = self.regs.get(rb);
                self.regs.set(b, value);
            }

            ExtOp::Swap => self.regs.swap(b, rb),

            ExtOp::StackMem => return self.execute_stack(instr),
        }

        Ok(())
    }

    /// Execute a stack/memory-group instruction (extended opcode 9).
    ///
    /// The stack grows upward: a push writes at `sp` and then adds 2, a pop
    /// reads at `sp - 2` and then subtracts 2.
    fn execute_stack(&mut self, instr: Instruction) -> Result<(), CpuError> {
        let r = instr.real_reg_b();
        let sp = self.regs.sp();

        match instr.stack_op() {
            StackOp::PushImm => {
                let value = self.fetch_operand()?;
                self.bus.write_u16(sp, value)?;
                self.regs.advance_pc(2);
                self.regs.set_sp(sp.wrapping_add(2));
            }

            StackOp::PushReg => {
                self.bus.write_u16(sp, self.regs.get(r))?;
                self.regs.set_sp(sp.wrapping_add(2));
            }

            StackOp::PopReg => {
                let value = self.bus.read_u16(sp.wrapping_sub(2))?;
                self.regs.set(r, value);
                let sp = self.regs.sp();
                self.regs.set_sp(sp.wrapping_sub(2));
            }

            StackOp::CallAddr => {
                let target = self.fetch_operand()?;
                let return_addr = self.regs.pc().wrapping_add(2);
                self.bus.write_u16(sp, return_addr)?;
                self.regs.set_pc(target);
                self.regs.set_sp(sp.wrapping_add(2));
            }

            StackOp::CallReg => {
                let target = self.regs.get(r);
                self.bus.write_u16(sp, self.regs.pc())?;
                self.regs.set_pc(target);
                self.regs.set_sp(sp.wrapping_add(2));
            }

            StackOp::Ret => {
                let return_addr = self.bus.read_u16(sp.wrapping_sub(2))?;
                self.regs.set_pc(return_addr);
                self.regs.set_sp(sp.wrapping_sub(2));
            }

            StackOp::StoreAddr => {
                let addr = self.fetch_operand()?;
                self.bus.write_u16(addr, self.regs.get(r))?;
                self.regs.advance_pc(2);
            }

            StackOp::LoadAddr => {
                let addr = self.fetch_operand()?;
                let value = self.bus.read_u16(addr)?;
                self.regs.set(r, value);
                self.regs.advance_pc(2);
            }

            StackOp::Reserved(_) => {}
        }

        Ok(())
    }

    /// Read the 2-byte operand at the program counter without advancing it.
    fn fetch_operand(&mut self) -> Result<u16, CpuError> {
        Ok(self.bus.read_u16(self.regs.pc())?)
    }

    fn alu(&mut self, dst: u8, operand: u16, op: impl FnOnce(u16, u16) -> u16) {
        let value = op(self.regs.get(dst), operand);
        self.regs.set(dst, value);
    }

    fn alu_rr(&mut self, dst: u8, src: u8, op: impl FnOnce(u16, u16) -> u16) {
        let operand = self.regs.get(src);
        self.alu(dst, operand, op);
    }
}

/// Logical shift left; shift counts of 16 or more clear the value.
pub fn shift_left(value: u16, count: u16) -> u16 {
    value.checked_shl(count as u32).unwrap_or(0)
}

/// Logical shift right; shift counts of 16 or more clear the value.
pub fn shift_right(value: u16, count: u16) -> u16 {
    value.checked_shr(count as u32).unwrap_or(0)
}

impl<B: Bus + Default> Default for Cpu<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: Bus> std::fmt::Debug for Cpu<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state())
            .field("regs", &self.regs)
            .finish()
    }
}

/// Flat error code, as reported to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    AddressInvalid,
    InstructionInvalid,
    UnknownError,
    ArithmeticFault,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorCode::AddressInvalid => "Address invalid",
            ErrorCode::InstructionInvalid => "Instruction invalid",
            ErrorCode::UnknownError => "Unknown error",
            ErrorCode::ArithmeticFault => "Arithmetic fault",
        };
        f.write_str(text)
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("instruction invalid: nothing can be fetched at {pc:#06X}")]
    InstructionInvalid { pc: u16 },

    #[error("arithmetic fault: {} by zero", .op.mnemonic())]
    ArithmeticFault { op: Opcode },
}

impl CpuError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CpuError::Bus(BusError::AddressInvalid { .. }) => ErrorCode::AddressInvalid,
            CpuError::Bus(BusError::Unknown(_)) => ErrorCode::UnknownError,
            CpuError::InstructionInvalid { .. } => ErrorCode::InstructionInvalid,
            CpuError::ArithmeticFault { .. } => ErrorCode::ArithmeticFault,
        }
    }
}
