//! Instruction decoder for the NEC16.
//!
//! Every instruction starts with a two-byte word:
//!
//! ```text
//!   byte 0            byte 1
//!   7..4     3..0     7..4     3..0
//!   opcode   regA     regB     realregB
//!            \______ immediate (12 bits) ______/
//! ```
//!
//! Primary opcode 0 is the extended group, keyed by `regA`. Extended
//! sub-opcode 9 is the stack/memory group, keyed by `regB`. Some extended
//! and stack instructions are followed by a 2-byte little-endian operand.

use serde::{Serialize, Deserialize};

/// Primary opcode, the high nibble of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Extended group, sub-opcode in `regA`.
    Eops,
    /// Jump to `regs[regA]` if the condition result is true.
    Jmp,
    /// `regs[regA] := bus[regs[INDEX]]`
    Gm,
    /// `bus[regs[INDEX]] := low byte of regs[regA]`
    Sm,
    /// `regs[regA] |= imm & 0xFF`
    Or,
    Orr,
    And,
    Xor,
    Not,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl Opcode {
    /// All primary opcodes in encoding order.
    pub const ALL: [Opcode; 16] = [
        Opcode::Eops,
        Opcode::Jmp,
        Opcode::Gm,
        Opcode::Sm,
        Opcode::Or,
        Opcode::Orr,
        Opcode::And,
        Opcode::Xor,
        Opcode::Not,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
    ];

    /// Opcode for a 4-bit field. Bits above the low nibble are ignored.
    #[inline]
    pub fn from_nibble(nibble: u8) -> Self {
        Self::ALL[(nibble & 0x0F) as usize]
    }

    #[inline]
    pub fn to_nibble(self) -> u8 {
        self as u8
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Eops => "EOPS",
            Opcode::Jmp => "JMP",
            Opcode::Gm => "GM",
            Opcode::Sm => "SM",
            Opcode::Or => "OR",
            Opcode::Orr => "ORR",
            Opcode::And => "AND",
            Opcode::Xor => "XOR",
            Opcode::Not => "NOT",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
        }
    }
}

/// Extended opcode (primary opcode 0), keyed by `regA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtOp {
    Nop,
    /// `cond := regs[regB] == regs[realregB]`
    CmpEq,
    /// `cond := regs[regB] > regs[realregB]`
    CmpGt,
    /// `cond := regs[regB] < regs[realregB]`
    CmpLt,
    /// `regs[regB] := operand`
    LoadImm,
    /// Jump to the operand address if the condition result is true.
    JmpImm,
    /// `regs[regB] := regs[realregB]`
    Copy,
    /// Exchange `regs[regB]` and `regs[realregB]`.
    Swap,
    /// Unconditional jump to the operand address.
    Ujmp,
    /// Stack/memory group, sub-opcode in `regB`.
    StackMem,
    /// Unassigned sub-opcode; executes as a no-op.
    Reserved(u8),
}

impl ExtOp {
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x0 => ExtOp::Nop,
            0x1 => ExtOp::CmpEq,
            0x2 => ExtOp::CmpGt,
            0x3 => ExtOp::CmpLt,
            0x4 => ExtOp::LoadImm,
            0x5 => ExtOp::JmpImm,
            0x6 => ExtOp::Copy,
            0x7 => ExtOp::Swap,
            0x8 => ExtOp::Ujmp,
            0x9 => ExtOp::StackMem,
            other => ExtOp::Reserved(other),
        }
    }

    pub fn to_nibble(self) -> u8 {
        match self {
            ExtOp::Nop => 0x0,
            ExtOp::CmpEq => 0x1,
            ExtOp::CmpGt => 0x2,
            ExtOp::CmpLt => 0x3,
            ExtOp::LoadImm => 0x4,
            ExtOp::JmpImm => 0x5,
            ExtOp::Copy => 0x6,
            ExtOp::Swap => 0x7,
            ExtOp::Ujmp => 0x8,
            ExtOp::StackMem => 0x9,
            ExtOp::Reserved(n) => n & 0x0F,
        }
    }
}

/// Stack/memory sub-opcode (extended opcode 9), keyed by `regB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackOp {
    /// Push the 16-bit operand.
    PushImm,
    /// Push `regs[realregB]`.
    PushReg,
    /// Pop into `regs[realregB]`.
    PopReg,
    /// Push the address after the operand, jump to the operand.
    CallAddr,
    /// Push the program counter, jump to `regs[realregB]`.
    CallReg,
    /// Pop into the program counter.
    Ret,
    /// `bus16[operand] := regs[realregB]`
    StoreAddr,
    /// `regs[realregB] := bus16[operand]`
    LoadAddr,
    /// Unassigned sub-opcode; executes as a no-op.
    Reserved(u8),
}

impl StackOp {
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x0 => StackOp::PushImm,
            0x1 => StackOp::PushReg,
            0x2 => StackOp::PopReg,
            0x3 => StackOp::CallAddr,
            0x4 => StackOp::CallReg,
            0x5 => StackOp::Ret,
            0x6 => StackOp::StoreAddr,
            0x7 => StackOp::LoadAddr,
            other => StackOp::Reserved(other),
        }
    }

    pub fn to_nibble(self) -> u8 {
        match self {
            StackOp::PushImm => 0x0,
            StackOp::PushReg => 0x1,
            StackOp::PopReg => 0x2,
            StackOp::CallAddr => 0x3,
            StackOp::CallReg => 0x4,
            StackOp::Ret => 0x5,
            StackOp::StoreAddr => 0x6,
            StackOp::LoadAddr => 0x7,
            StackOp::Reserved(n) => n & 0x0F,
        }
    }
}

/// A decoded two-byte instruction word.
///
/// Fields are taken verbatim from the bit layout; which of them a handler
/// uses depends on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub reg_a: u8,
    pub reg_b: u8,
    /// Low nibble of byte 0 followed by all of byte 1.
    pub imm: u16,
    /// Raw byte 1.
    pub second_byte: u8,
}

impl Instruction {
    /// Register index carried in the low nibble of byte 1.
    #[inline]
    pub fn real_reg_b(&self) -> u8 {
        self.second_byte & 0x0F
    }

    /// Extended sub-opcode. Only meaningful when `opcode` is `Eops`.
    #[inline]
    pub fn ext_op(&self) -> ExtOp {
        ExtOp::from_nibble(self.reg_a)
    }

    /// Stack/memory sub-opcode. Only meaningful for `Eops` + `StackMem`.
    #[inline]
    pub fn stack_op(&self) -> StackOp {
        StackOp::from_nibble(self.reg_b)
    }

    /// Number of inline operand bytes following the instruction word.
    pub fn operand_len(&self) -> u16 {
        if self.opcode != Opcode::Eops {
            return 0;
        }
        match self.ext_op() {
            ExtOp::LoadImm | ExtOp::JmpImm | ExtOp::Ujmp => 2,
            ExtOp::StackMem => match self.stack_op() {
                StackOp::PushImm | StackOp::CallAddr | StackOp::StoreAddr | StackOp::LoadAddr => 2,
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Re-encode the instruction word.
    pub fn to_bytes(&self) -> [u8; 2] {
        [(self.opcode.to_nibble() << 4) | (self.reg_a & 0x0F), self.second_byte]
    }
}

/// Decode a fetched instruction word. Cannot fail: every bit pattern is
/// an instruction.
pub fn decode(byte0: u8, byte1: u8) -> Instruction {
    Instruction {
        opcode: Opcode::from_nibble(byte0 >> 4),
        reg_a: byte0 & 0x0F,
        reg_b: byte1 >> 4,
        imm: (((byte0 & 0x0F) as u16) << 8) | byte1 as u16,
        second_byte: byte1,
    }
}

/// Encode a primary instruction from its three nibble fields.
pub fn encode(opcode: Opcode, reg_a: u8, reg_b: u8) -> [u8; 2] {
    [(opcode.to_nibble() << 4) | (reg_a & 0x0F), (reg_b & 0x0F) << 4]
}

/// Encode `OR reg, imm`.
pub fn encode_or(reg: u8, imm: u8) -> [u8; 2] {
    [(Opcode::Or.to_nibble() << 4) | (reg & 0x0F), imm]
}

/// Encode an extended-group instruction word.
pub fn encode_ext(op: ExtOp, reg_b: u8, real_reg_b: u8) -> [u8; 2] {
    [op.to_nibble(), ((reg_b & 0x0F) << 4) | (real_reg_b & 0x0F)]
}

/// Encode a stack/memory-group instruction word.
pub fn encode_stack(op: StackOp, real_reg_b: u8) -> [u8; 2] {
    encode_ext(ExtOp::StackMem, op.to_nibble(), real_reg_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fields() {
        let instr = decode(0xB3, 0x4C);
        assert_eq!(instr.opcode, Opcode::Add);
        assert_eq!(instr.reg_a, 0x3);
        assert_eq!(instr.reg_b, 0x4);
        assert_eq!(instr.real_reg_b(), 0xC);
        assert_eq!(instr.imm, 0x34C);
        assert_eq!(instr.second_byte, 0x4C);
    }

    #[test]
    fn test_every_high_nibble_decodes() {
        for nibble in 0u8..16 {
            let instr = decode(nibble << 4, 0);
            assert_eq!(instr.opcode.to_nibble(), nibble);
        }
    }

    #[test]
    fn test_ext_and_stack_subops() {
        let [b0, b1] = encode_stack(StackOp::CallReg, 7);
        let instr = decode(b0, b1);
        assert_eq!(instr.opcode, Opcode::Eops);
        assert_eq!(instr.ext_op(), ExtOp::StackMem);
        assert_eq!(instr.stack_op(), StackOp::CallReg);
        assert_eq!(instr.real_reg_b(), 7);
    }

    #[test]
    fn test_reserved_subops() {
        assert_eq!(ExtOp::from_nibble(0xA), ExtOp::Reserved(0xA));
        assert_eq!(ExtOp::from_nibble(0xF), ExtOp::Reserved(0xF));
        assert_eq!(StackOp::from_nibble(0x8), StackOp::Reserved(0x8));
        assert_eq!(StackOp::Reserved(0x8).to_nibble(), 0x8);
    }

    #[test]
    fn test_operand_len() {
        let with_operand = [
            encode_ext(ExtOp::LoadImm, 3, 0),
            encode_ext(ExtOp::JmpImm, 0, 0),
            encode_ext(ExtOp::Ujmp, 0, 0),
            encode_stack(StackOp::PushImm, 0),
            encode_stack(StackOp::CallAddr, 0),
            encode_stack(StackOp::StoreAddr, 4),
            encode_stack(StackOp::LoadAddr, 4),
        ];
        for [b0, b1] in with_operand {
            assert_eq!(decode(b0, b1).operand_len(), 2, "{:02X} {:02X}", b0, b1);
        }

        let without = [
            encode(Opcode::Add, 1, 2),
            encode_ext(ExtOp::Copy, 1, 2),
            encode_stack(StackOp::Ret, 0),
            encode_stack(StackOp::PushReg, 5),
        ];
        for [b0, b1] in without {
            assert_eq!(decode(b0, b1).operand_len(), 0);
        }
    }

    #[test]
    fn test_to_bytes_matches_fetch() {
        let instr = decode(0x4A, 0xFF);
        assert_eq!(instr.to_bytes(), [0x4A, 0xFF]);
        assert_eq!(encode_or(0xA, 0xFF), [0x4A, 0xFF]);
    }
}
