use super::*;

/// Jumps, calls, returns and restarts.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum JumpOp {
    #[display("JR {_0}, {_1:+}")]
    ConditionalRelative(Condition, i8),
    /// The offset is relative to the address after the operand.
    #[display("JR {_0:+}")]
    Relative(i8),
    #[display("JP {_0}, 0x{_1:0>4X}")]
    ConditionalAbsolute(Condition, u16),
    #[display("JP 0x{_0:0>4X}")]
    Absolute(u16),
    /// PC = HL. No memory is read, so this is the cheapest jump.
    #[display("JP HL")]
    AbsoluteHl,
    #[display("CALL 0x{_0:0>4X}")]
    Call(u16),
    #[display("CALL {_0}, 0x{_1:0>4X}")]
    ConditionalCall(Condition, u16),
    #[display("RET")]
    Return,
    #[display("RET {_0}")]
    ConditionalReturn(Condition),
    /// RETI. Unlike EI, interrupts are back on immediately.
    #[display("RETI")]
    ReturnFromInterrupt,
    /// A one byte call to one of the eight vectors in page zero.
    #[display("RST 0x{_0:0>2X}")]
    Rst(u8),
}

impl JumpOp {
    /// Taken branches pay for the extra fetch and pushes.
    pub fn cycles(&self, cpu: &Cpu) -> u8 {
        match self {
            JumpOp::ConditionalRelative(cond, _) => 8 + (4 * cond.passed(cpu) as u8),
            JumpOp::Relative(_) => 12,
            JumpOp::ConditionalAbsolute(cond, _) => 12 + (4 * cond.passed(cpu) as u8),
            JumpOp::Absolute(_) => 16,
            JumpOp::AbsoluteHl => 4,
            JumpOp::Call(_) => 24,
            JumpOp::ConditionalCall(cond, _) => 12 + (12 * cond.passed(cpu) as u8),
            JumpOp::Return => 16,
            JumpOp::ConditionalReturn(cond) => 8 + (12 * cond.passed(cpu) as u8),
            JumpOp::ReturnFromInterrupt => 16,
            JumpOp::Rst(_) => 16,
        }
    }

    /// The encoded length in bytes, op code and operands included.
    pub const fn size(&self) -> u8 {
        match self {
            JumpOp::ConditionalRelative(_, _) => 2,
            JumpOp::Relative(_) => 2,
            JumpOp::ConditionalAbsolute(_, _) => 3,
            JumpOp::Absolute(_) => 3,
            JumpOp::Call(_) => 3,
            JumpOp::ConditionalCall(_, _) => 3,
            JumpOp::AbsoluteHl
            | JumpOp::Return
            | JumpOp::ConditionalReturn(_)
            | JumpOp::ReturnFromInterrupt
            | JumpOp::Rst(_) => 1,
        }
    }
}
