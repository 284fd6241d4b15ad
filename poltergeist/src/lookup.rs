//! Instruction decoding.
//!
//! Every op code gets its own decoder function, monomorphized from one of five generic decoders
//! over the op code itself. The op code's bit fields select the operation and its registers at
//! compile time, so at run time decoding is a table index plus whatever operand reads the op
//! needs.
//!
//! The fields, with the op code written as `xxyyyzzz`:
//!  - `x` picks one of the four quarters of the table.
//!  - `zzz` usually picks the operation within a quarter, or the source register.
//!  - `yyy` picks the destination register, the condition, or the ALU op. Its top two bits (`p`)
//!    name a register pair and its low bit (`q`) often flips between two related ops.

use array_concat::concat_arrays;

use crate::instruction::*;
use crate::mem::MemoryLike;

/// Decodes the instruction starting at `pc`, immediate operands included. Op codes with no
/// defined behavior decode to [`Instruction::Unused`].
pub fn parse_instruction(mem: &dyn MemoryLike, pc: u16) -> Instruction {
    OP_LOOKUP[mem.read_byte(pc) as usize](mem, pc)
}

type Decoder = fn(&dyn MemoryLike, u16) -> Instruction;

fn imm8(mem: &dyn MemoryLike, pc: u16) -> u8 {
    mem.read_byte(pc.wrapping_add(1))
}

fn imm16(mem: &dyn MemoryLike, pc: u16) -> u16 {
    u16::from_le_bytes([imm8(mem, pc), mem.read_byte(pc.wrapping_add(2))])
}

/// The 8-bit operand encoded in the low three bits of `code`.
const fn reg(code: u8) -> RegOrPointer {
    match code & 0b111 {
        0 => RegOrPointer::Reg(HalfRegister::B),
        1 => RegOrPointer::Reg(HalfRegister::C),
        2 => RegOrPointer::Reg(HalfRegister::D),
        3 => RegOrPointer::Reg(HalfRegister::E),
        4 => RegOrPointer::Reg(HalfRegister::H),
        5 => RegOrPointer::Reg(HalfRegister::L),
        6 => RegOrPointer::Pointer,
        _ => RegOrPointer::Reg(HalfRegister::A),
    }
}

const fn wide(op: u8) -> WideReg {
    match (op >> 4) & 0b11 {
        0 => WideReg::BC,
        1 => WideReg::DE,
        2 => WideReg::HL,
        _ => WideReg::SP,
    }
}

const fn stack(op: u8) -> StackReg {
    match (op >> 4) & 0b11 {
        0 => StackReg::BC,
        1 => StackReg::DE,
        2 => StackReg::HL,
        _ => StackReg::AF,
    }
}

const fn pair(op: u8) -> PairPointer {
    match (op >> 4) & 0b11 {
        0 => PairPointer::BC,
        1 => PairPointer::DE,
        2 => PairPointer::Hli,
        _ => PairPointer::Hld,
    }
}

const fn condition(op: u8) -> Condition {
    match (op >> 3) & 0b11 {
        0 => Condition::NotZero,
        1 => Condition::Zero,
        2 => Condition::NotCarry,
        _ => Condition::Carry,
    }
}

fn alu(op: u8, operand: SomeByte) -> ArithmeticOp {
    match (op >> 3) & 0b111 {
        0 => ArithmeticOp::Add(operand),
        1 => ArithmeticOp::Adc(operand),
        2 => ArithmeticOp::Sub(operand),
        3 => ArithmeticOp::Sbc(operand),
        4 => ArithmeticOp::And(operand),
        5 => ArithmeticOp::Xor(operand),
        6 => ArithmeticOp::Or(operand),
        _ => ArithmeticOp::Cp(operand),
    }
}

/// 0x00 through 0x3F. Immediate loads, 16-bit arithmetic, relative jumps and the accumulator
/// odds and ends.
fn misc<const OP: u8>(mem: &dyn MemoryLike, pc: u16) -> Instruction {
    let y = OP >> 3;
    let q = y & 1 == 1;
    match OP & 0b111 {
        0 => match y {
            0 => ControlOp::Nop.into(),
            1 => LoadOp::StoreSp(imm16(mem, pc)).into(),
            2 => ControlOp::Stop.into(),
            3 => JumpOp::Relative(imm8(mem, pc) as i8).into(),
            _ => JumpOp::ConditionalRelative(condition(OP), imm8(mem, pc) as i8).into(),
        },
        1 if q => ArithmeticOp::Add16(wide(OP)).into(),
        1 => LoadOp::Immediate16(wide(OP), imm16(mem, pc)).into(),
        2 if q => LoadOp::LoadFromPair(pair(OP)).into(),
        2 => LoadOp::StoreToPair(pair(OP)).into(),
        3 if q => ArithmeticOp::Dec16(wide(OP)).into(),
        3 => ArithmeticOp::Inc16(wide(OP)).into(),
        4 => ArithmeticOp::Inc(reg(y)).into(),
        5 => ArithmeticOp::Dec(reg(y)).into(),
        6 => LoadOp::Immediate(reg(y), imm8(mem, pc)).into(),
        _ => match y {
            0 => BitShiftOp::Rlca.into(),
            1 => BitShiftOp::Rrca.into(),
            2 => BitShiftOp::Rla.into(),
            3 => BitShiftOp::Rra.into(),
            4 => Instruction::Daa,
            5 => Instruction::Cpl,
            6 => Instruction::Scf,
            _ => Instruction::Ccf,
        },
    }
}

/// 0x40 through 0x7F. Register to register loads, with HALT where `LD (HL), (HL)` would be.
fn load<const OP: u8>(_: &dyn MemoryLike, _: u16) -> Instruction {
    match OP {
        0x76 => ControlOp::Halt.into(),
        _ => LoadOp::Basic {
            dest: reg(OP >> 3),
            src: reg(OP),
        }
        .into(),
    }
}

/// 0x80 through 0xBF. The ALU on A and a register.
fn accumulator<const OP: u8>(_: &dyn MemoryLike, _: u16) -> Instruction {
    alu(OP, reg(OP).into()).into()
}

/// 0xC0 through 0xFF. Calls, returns and stack ops, the high page loads, immediate ALU ops and
/// the prefix. All eleven unused op codes live here.
fn control<const OP: u8>(mem: &dyn MemoryLike, pc: u16) -> Instruction {
    let y = (OP >> 3) & 0b111;
    let p = y >> 1;
    let q = y & 1 == 1;
    match (OP & 0b111, y) {
        (0, 0..=3) => JumpOp::ConditionalReturn(condition(OP)).into(),
        (0, 4) => LoadOp::StoreHigh(imm8(mem, pc)).into(),
        (0, 5) => ArithmeticOp::AddSp(imm8(mem, pc) as i8).into(),
        (0, 6) => LoadOp::LoadHigh(imm8(mem, pc)).into(),
        (0, _) => LoadOp::HlFromSpOffset(imm8(mem, pc) as i8).into(),
        (1, _) if !q => LoadOp::Pop(stack(OP)).into(),
        (1, _) => match p {
            0 => JumpOp::Return.into(),
            1 => JumpOp::ReturnFromInterrupt.into(),
            2 => JumpOp::AbsoluteHl.into(),
            _ => LoadOp::SpFromHl.into(),
        },
        (2, 0..=3) => JumpOp::ConditionalAbsolute(condition(OP), imm16(mem, pc)).into(),
        (2, 4) => LoadOp::StoreHighC.into(),
        (2, 5) => LoadOp::StoreA { ptr: imm16(mem, pc) }.into(),
        (2, 6) => LoadOp::LoadHighC.into(),
        (2, _) => LoadOp::LoadA { ptr: imm16(mem, pc) }.into(),
        (3, 0) => JumpOp::Absolute(imm16(mem, pc)).into(),
        (3, 1) => PREFIXED_OP_LOOKUP[imm8(mem, pc) as usize](mem, pc),
        (3, 6) => Instruction::Di,
        (3, 7) => Instruction::Ei,
        (4, 0..=3) => JumpOp::ConditionalCall(condition(OP), imm16(mem, pc)).into(),
        (5, _) if !q => LoadOp::Push(stack(OP)).into(),
        (5, 1) => JumpOp::Call(imm16(mem, pc)).into(),
        (6, _) => alu(OP, SomeByte::Immediate(imm8(mem, pc))).into(),
        (7, _) => JumpOp::Rst(OP & 0b0011_1000).into(),
        _ => Instruction::Unused(OP),
    }
}

/// The byte after 0xCB. The pc handed in still points at the prefix.
fn prefixed<const OP: u8>(_: &dyn MemoryLike, _: u16) -> Instruction {
    let target = reg(OP);
    let y = (OP >> 3) & 0b111;
    let bit_op = |op| Instruction::Bit(BitOp { bit: y, reg: target, op });
    match OP >> 6 {
        0 => match y {
            0 => BitShiftOp::Rlc(target),
            1 => BitShiftOp::Rrc(target),
            2 => BitShiftOp::Rl(target),
            3 => BitShiftOp::Rr(target),
            4 => BitShiftOp::Sla(target),
            5 => BitShiftOp::Sra(target),
            6 => BitShiftOp::Swap(target),
            _ => BitShiftOp::Srl(target),
        }
        .into(),
        1 => bit_op(BitOpInner::Bit),
        2 => bit_op(BitOpInner::Res),
        _ => bit_op(BitOpInner::Set),
    }
}

/// Eight consecutive op codes starting at `$base`.
macro_rules! row {
    ($decode: ident, $base: expr) => {{
        const ROW: [Decoder; 8] = [
            $decode::<{ $base }>,
            $decode::<{ $base + 1 }>,
            $decode::<{ $base + 2 }>,
            $decode::<{ $base + 3 }>,
            $decode::<{ $base + 4 }>,
            $decode::<{ $base + 5 }>,
            $decode::<{ $base + 6 }>,
            $decode::<{ $base + 7 }>,
        ];
        ROW
    }};
}

/// A quarter of a table, all decoded by the same generic decoder.
macro_rules! quarter {
    ($decode: ident, $base: expr) => {{
        const QUARTER: [Decoder; 0x40] = concat_arrays!(
            row!($decode, $base),
            row!($decode, $base + 0x08),
            row!($decode, $base + 0x10),
            row!($decode, $base + 0x18),
            row!($decode, $base + 0x20),
            row!($decode, $base + 0x28),
            row!($decode, $base + 0x30),
            row!($decode, $base + 0x38)
        );
        QUARTER
    }};
}

// array_concat emits cfgs that rustc does not know about
#[allow(unexpected_cfgs)]
static OP_LOOKUP: [Decoder; 0x100] = concat_arrays!(
    quarter!(misc, 0x00),
    quarter!(load, 0x40),
    quarter!(accumulator, 0x80),
    quarter!(control, 0xC0)
);

#[allow(unexpected_cfgs)]
static PREFIXED_OP_LOOKUP: [Decoder; 0x100] = concat_arrays!(
    quarter!(prefixed, 0x00),
    quarter!(prefixed, 0x40),
    quarter!(prefixed, 0x80),
    quarter!(prefixed, 0xC0)
);
