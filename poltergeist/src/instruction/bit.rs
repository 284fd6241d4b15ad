use super::*;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{op} {bit}, {reg}")]
pub struct BitOp {
    pub bit: u8,
    pub reg: RegOrPointer,
    pub op: BitOpInner,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum BitOpInner {
    #[display("BIT")]
    Bit,
    #[display("RES")]
    Res,
    #[display("SET")]
    Set,
}

impl BitOp {
    /// BIT on `(HL)` only reads memory, so it is cheaper than RES or SET on `(HL)`.
    pub fn cycles(&self) -> u8 {
        match (self.op, self.reg) {
            (_, RegOrPointer::Reg(_)) => 8,
            (BitOpInner::Bit, RegOrPointer::Pointer) => 12,
            (_, RegOrPointer::Pointer) => 16,
        }
    }

    /// The encoded length in bytes, op code and operands included.
    pub const fn size(&self) -> u8 {
        2
    }
}
