//! End-to-end programs on a flat bus and on the TIOS system.

use nec16::cpu::decode::{encode, encode_ext, encode_or, encode_stack, ExtOp, Opcode, StackOp};
use nec16::cpu::registers::{ENTRY_POINT, INDEX};
use nec16::system::tios::StopReason;
use nec16::{Cpu, CpuError, ErrorCode, FlatMemory, Registers, RomImage, Tios, TiosConfig};

/// Little builder for instruction streams.
#[derive(Default)]
struct Program {
    bytes: Vec<u8>,
}

impl Program {
    fn word(mut self, word: [u8; 2]) -> Self {
        self.bytes.extend_from_slice(&word);
        self
    }

    fn with_operand(mut self, word: [u8; 2], operand: u16) -> Self {
        self.bytes.extend_from_slice(&word);
        self.bytes.extend_from_slice(&operand.to_le_bytes());
        self
    }

    fn set(self, reg: u8, value: u16) -> Self {
        self.with_operand(encode_ext(ExtOp::LoadImm, reg, 0), value)
    }

    /// Address the next instruction will be placed at.
    fn here(&self) -> u16 {
        ENTRY_POINT + self.bytes.len() as u16
    }
}

fn flat_cpu(program: &Program) -> Cpu<FlatMemory> {
    let mut mem = FlatMemory::new();
    mem.load(ENTRY_POINT, &program.bytes);
    Cpu::new(mem)
}

#[test]
fn test_load_immediate_scenario() {
    let program = Program::default().set(3, 0x0005);
    let mut cpu = Cpu::with_registers(FlatMemory::new(), Registers::new());
    cpu.bus_mut().load(0, &program.bytes);

    cpu.step().unwrap();

    assert_eq!(cpu.regs.get(3), 5);
    assert_eq!(cpu.regs.pc(), 4);
}

#[test]
fn test_push_imm_pop_scenario() {
    let program = Program::default()
        .with_operand(encode_stack(StackOp::PushImm, 0), 0x1234)
        .word(encode_stack(StackOp::PopReg, 6));
    let mut cpu = flat_cpu(&program);
    cpu.regs.set_sp(0xA000);

    cpu.run_limited(2).unwrap();

    assert_eq!(cpu.regs.get(6), 0x1234);
    assert_eq!(cpu.regs.sp(), 0xA000);
}

#[test]
fn test_divide_by_zero_scenario() {
    let program = Program::default().word(encode(Opcode::Div, 3, 4));
    let mut cpu = flat_cpu(&program);
    cpu.regs.set(3, 42);

    let err = cpu.step().unwrap_err();

    assert_eq!(err, CpuError::ArithmeticFault { op: Opcode::Div });
    assert_eq!(err.code(), ErrorCode::ArithmeticFault);
    assert_eq!(cpu.regs.get(3), 42);
}

#[test]
fn test_or_immediate_scenario() {
    // OR r1, 0x1FF: the nibble 1 lands in regA's slot, so the 12-bit
    // immediate of r1 is 0x1FF and only its low byte applies.
    let program = Program::default().word([0x41, 0xFF]);
    let mut cpu = flat_cpu(&program);

    let instr = cpu.step().unwrap();

    assert_eq!(instr.imm, 0x1FF);
    assert_eq!(cpu.regs.get(1), 0x00FF);
    assert_eq!(encode_or(1, 0xFF), [0x41, 0xFF]);
}

#[test]
fn test_call_and_return() {
    // main: calla sub; set r4, 1; <halt sentinel via ujmp>
    // sub:  set r3, 7; ret
    let sub_addr = 0x0100;
    let mut program = Program::default().with_operand(encode_stack(StackOp::CallAddr, 0), sub_addr);
    let return_addr = program.here();
    program = program.set(4, 1);

    let sub = Program::default().set(3, 7).word(encode_stack(StackOp::Ret, 0));

    let mut cpu = flat_cpu(&program);
    cpu.bus_mut().load(sub_addr, &sub.bytes);
    cpu.regs.set_sp(0x8000);

    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc(), sub_addr);

    cpu.run_limited(2).unwrap();
    assert_eq!(cpu.regs.pc(), return_addr);
    assert_eq!(cpu.regs.sp(), 0x8000);

    cpu.step().unwrap();
    assert_eq!(cpu.regs.get(3), 7);
    assert_eq!(cpu.regs.get(4), 1);
}

#[test]
fn test_call_register_and_return() {
    let mut program = Program::default().set(9, 0x0200).word(encode_stack(StackOp::CallReg, 9));
    let return_addr = program.here();
    program = program.word(encode_ext(ExtOp::Nop, 0, 0));

    let mut cpu = flat_cpu(&program);
    cpu.bus_mut().load(0x0200, &encode_stack(StackOp::Ret, 0));
    cpu.regs.set_sp(0x8000);

    cpu.run_limited(3).unwrap();
    assert_eq!(cpu.regs.pc(), return_addr);
    assert_eq!(cpu.regs.sp(), 0x8000);
}

#[test]
fn test_counting_loop() {
    // r3 counts 0..10; r5 accumulates r3 each pass.
    let mut program = Program::default().set(3, 0).set(4, 1).set(5, 0).set(6, 10);
    let loop_top = program.here();
    program = program
        .word(encode(Opcode::Add, 5, 3))
        .word(encode(Opcode::Add, 3, 4))
        .word(encode_ext(ExtOp::CmpLt, 3, 6))
        .with_operand(encode_ext(ExtOp::JmpImm, 0, 0), loop_top);
    let done = program.here();

    let mut cpu = flat_cpu(&program);
    while cpu.regs.pc() != done {
        cpu.step().unwrap();
    }

    assert_eq!(cpu.regs.get(3), 10);
    assert_eq!(cpu.regs.get(5), 45);
    assert_eq!(cpu.regs.condition(), 1);
}

#[test]
fn test_halt_sentinel_stops_execution() {
    let program = Program::default().with_operand(encode_ext(ExtOp::Ujmp, 0, 0), 0xFFFF);
    let mut cpu = flat_cpu(&program);

    cpu.step().unwrap();
    let err = cpu.step().unwrap_err();

    assert_eq!(err, CpuError::InstructionInvalid { pc: 0xFFFF });
    assert_eq!(cpu.regs.pc(), 0xFFFF);
}

fn hello_rom() -> RomImage {
    let program = Program::default()
        .set(INDEX, 2)
        .set(0, b'H' as u16)
        .word(encode(Opcode::Sm, 0, 0))
        .set(0, b'i' as u16)
        .word(encode(Opcode::Sm, 0, 0))
        .set(INDEX, 0)
        .word(encode(Opcode::Sm, 0, 0));
    RomImage::from_bytes(&program.bytes)
}

#[test]
fn test_tios_hello() {
    let mut tios = Tios::new(&hello_rom(), std::io::empty(), Vec::new(), TiosConfig::new());

    let summary = tios.run().unwrap();

    assert_eq!(summary.stop, StopReason::ExitStrobe);
    assert_eq!(summary.instructions, 7);
    assert_eq!(tios.cpu().bus().output(), b"Hi");
}

#[test]
fn test_tios_echo() {
    // Read one character, write it back twice, exit.
    let program = Program::default()
        .set(INDEX, 1)
        .word(encode(Opcode::Gm, 3, 0))
        .set(INDEX, 2)
        .word(encode(Opcode::Sm, 3, 0))
        .word(encode(Opcode::Sm, 3, 0))
        .set(INDEX, 0)
        .word(encode(Opcode::Sm, 3, 0));
    let rom = RomImage::from_bytes(&program.bytes);
    let input = std::io::Cursor::new(b"z".to_vec());
    let mut tios = Tios::new(&rom, input, Vec::new(), TiosConfig::new().with_trace(true));

    tios.run().unwrap();

    assert_eq!(tios.cpu().bus().output(), b"zz");
    assert_eq!(tios.cpu().regs.get(3), b'z' as u16);
}

#[test]
fn test_tios_summary_serializes() {
    let mut tios = Tios::new(&hello_rom(), std::io::empty(), std::io::sink(), TiosConfig::new());
    let summary = tios.run().unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["instructions"], 7);
    assert_eq!(json["stop"], "ExitStrobe");
}
