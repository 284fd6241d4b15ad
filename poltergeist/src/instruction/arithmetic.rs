use super::*;

/// ALU ops. The 8-bit forms always target A.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum ArithmeticOp {
    #[display("ADD {_0}")]
    Add(SomeByte),
    #[display("ADD HL, {_0}")]
    Add16(WideReg),
    /// Sets H and C from the low byte, like the other signed SP op.
    #[display("ADD SP, {_0:+}")]
    AddSp(i8),
    #[display("ADC {_0}")]
    Adc(SomeByte),
    #[display("SUB {_0}")]
    Sub(SomeByte),
    #[display("SBC {_0}")]
    Sbc(SomeByte),
    #[display("AND {_0}")]
    And(SomeByte),
    #[display("XOR {_0}")]
    Xor(SomeByte),
    #[display("OR {_0}")]
    Or(SomeByte),
    /// A subtraction that only keeps the flags.
    #[display("CP {_0}")]
    Cp(SomeByte),
    #[display("INC {_0}")]
    Inc(RegOrPointer),
    #[display("INC {_0}")]
    Inc16(WideReg),
    #[display("DEC {_0}")]
    Dec(RegOrPointer),
    #[display("DEC {_0}")]
    Dec16(WideReg),
}

impl ArithmeticOp {
    /// The base cost in clock cycles.
    pub fn cycles(&self) -> u8 {
        match self {
            ArithmeticOp::Add(byte)
            | ArithmeticOp::Adc(byte)
            | ArithmeticOp::Sub(byte)
            | ArithmeticOp::Sbc(byte)
            | ArithmeticOp::And(byte)
            | ArithmeticOp::Xor(byte)
            | ArithmeticOp::Or(byte)
            | ArithmeticOp::Cp(byte) => match byte {
                SomeByte::Operand(RegOrPointer::Reg(_)) => 4,
                _ => 8,
            },
            ArithmeticOp::Add16(_) => 8,
            ArithmeticOp::Inc(RegOrPointer::Pointer) => 12,
            ArithmeticOp::Inc(RegOrPointer::Reg(_)) => 4,
            ArithmeticOp::Dec(RegOrPointer::Pointer) => 12,
            ArithmeticOp::Dec(RegOrPointer::Reg(_)) => 4,
            ArithmeticOp::Inc16(_) => 8,
            ArithmeticOp::Dec16(_) => 8,
            ArithmeticOp::AddSp(_) => 16,
        }
    }

    /// The encoded length in bytes, op code and operands included.
    pub const fn size(&self) -> u8 {
        match self {
            ArithmeticOp::Add(SomeByte::Immediate(_))
            | ArithmeticOp::Adc(SomeByte::Immediate(_))
            | ArithmeticOp::Sub(SomeByte::Immediate(_))
            | ArithmeticOp::Sbc(SomeByte::Immediate(_))
            | ArithmeticOp::And(SomeByte::Immediate(_))
            | ArithmeticOp::Xor(SomeByte::Immediate(_))
            | ArithmeticOp::Or(SomeByte::Immediate(_))
            | ArithmeticOp::Cp(SomeByte::Immediate(_)) => 2,
            ArithmeticOp::AddSp(_) => 2,
            _ => 1,
        }
    }
}
