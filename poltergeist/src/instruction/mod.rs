use derive_more::From;
use derive_more::IsVariant;

use crate::cpu::Cpu;

mod arithmetic;
mod bit;
mod bit_shift;
mod control;
mod interrupt;
mod jump;
mod load;

pub use arithmetic::*;
pub use bit::*;
pub use bit_shift::*;
pub use control::*;
pub use interrupt::*;
pub use jump::*;
pub use load::*;

/// A fully decoded instruction, operands included. Produced by the lookup tables and consumed by
/// [`Cpu::execute`](crate::cpu::Cpu::execute).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum Instruction {
    #[display("{_0}")]
    Load(LoadOp),
    #[display("{_0}")]
    ControlOp(ControlOp),
    #[display("{_0}")]
    Jump(JumpOp),
    #[display("{_0}")]
    Arithmetic(ArithmeticOp),
    #[display("{_0}")]
    BitShift(BitShiftOp),
    #[display("{_0}")]
    Bit(BitOp),
    /// Decimal adjust of A after a BCD add or subtract.
    #[display("DAA")]
    Daa,
    #[display("SCF")]
    Scf,
    /// A = !A
    #[display("CPL")]
    Cpl,
    /// Flips the carry flag.
    #[display("CCF")]
    Ccf,
    #[display("DI")]
    Di,
    /// Takes effect after the following instruction.
    #[display("EI")]
    Ei,
    /// One of the eleven op codes with no defined behavior.
    #[display("UNUSED 0x{_0:0>2X}")]
    Unused(u8),
}

macro_rules! impl_from_op {
    ($($op: ident => $variant: ident),* $(,)?) => {
        $(
            impl From<$op> for Instruction {
                fn from(op: $op) -> Self {
                    Self::$variant(op)
                }
            }
        )*
    };
}

impl_from_op! {
    LoadOp => Load,
    ControlOp => ControlOp,
    JumpOp => Jump,
    ArithmeticOp => Arithmetic,
    BitShiftOp => BitShift,
    BitOp => Bit,
}

impl Instruction {
    /// The cost in clock cycles. Conditional ops read the flags to tell whether they are taken,
    /// so this has to be asked before the op runs.
    pub fn cycles(&self, cpu: &Cpu) -> u8 {
        match self {
            Instruction::Load(op) => op.cycles(),
            Instruction::ControlOp(op) => op.cycles(),
            Instruction::Jump(op) => op.cycles(cpu),
            Instruction::Arithmetic(op) => op.cycles(),
            Instruction::BitShift(op) => op.cycles(),
            Instruction::Bit(op) => op.cycles(),
            Instruction::Daa
            | Instruction::Scf
            | Instruction::Cpl
            | Instruction::Ccf
            | Instruction::Di
            | Instruction::Ei => 4,
            Instruction::Unused(_) => 0,
        }
    }

    /// The encoded length in bytes, op code and operands included.
    pub const fn size(&self) -> u8 {
        match self {
            Instruction::Load(op) => op.size(),
            Instruction::ControlOp(op) => op.size(),
            Instruction::Jump(op) => op.size(),
            Instruction::Arithmetic(op) => op.size(),
            Instruction::BitShift(op) => op.size(),
            Instruction::Bit(op) => op.size(),
            Instruction::Daa
            | Instruction::Scf
            | Instruction::Cpl
            | Instruction::Ccf
            | Instruction::Di
            | Instruction::Ei => 1,
            Instruction::Unused(_) => 0,
        }
    }
}

/// The second operand of an accumulator op: either a register (or `(HL)`) or a literal that
/// followed the op code.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, From, derive_more::Display)]
#[display("{_variant}")]
pub enum SomeByte {
    #[display("{_0}")]
    Operand(RegOrPointer),
    #[display("0x{_0:0>2X}")]
    Immediate(u8),
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum WideReg {
    #[display("BC")]
    BC,
    #[display("DE")]
    DE,
    #[display("HL")]
    HL,
    #[display("SP")]
    SP,
}

/// The pairs PUSH and POP can name. AF takes the place of SP.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum StackReg {
    #[display("BC")]
    BC,
    #[display("DE")]
    DE,
    #[display("HL")]
    HL,
    #[display("AF")]
    AF,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum Condition {
    #[display("Z")]
    Zero,
    #[display("NZ")]
    NotZero,
    #[display("C")]
    Carry,
    #[display("NC")]
    NotCarry,
}

impl Condition {
    /// Whether a conditional op with this condition is taken, given the current flags.
    pub fn passed(&self, cpu: &Cpu) -> bool {
        match self {
            Condition::Zero => cpu.zero_flag(),
            Condition::NotZero => !cpu.zero_flag(),
            Condition::Carry => cpu.carry_flag(),
            Condition::NotCarry => !cpu.carry_flag(),
        }
    }
}

/// The register pair addressed by the accumulator-only loads. The HL forms step HL once the
/// access is done.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum PairPointer {
    #[display("BC")]
    BC,
    #[display("DE")]
    DE,
    #[display("HL+")]
    Hli,
    #[display("HL-")]
    Hld,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum HalfRegister {
    #[display("A")]
    A,
    #[display("B")]
    B,
    #[display("C")]
    C,
    #[display("D")]
    D,
    #[display("E")]
    E,
    #[display("H")]
    H,
    #[display("L")]
    L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From, IsVariant, derive_more::Display)]
#[display("{_variant}")]
pub enum RegOrPointer {
    #[display("{_0}")]
    Reg(HalfRegister),
    #[display("(HL)")]
    Pointer,
}
