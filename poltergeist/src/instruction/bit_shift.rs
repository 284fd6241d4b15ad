use super::*;
use crate::cpu::check_bit_const;

/// Rotates and shifts. The accumulator forms (RLCA, RLA, RRCA, RRA) are the only unprefixed ones
/// and always clear the zero flag.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum BitShiftOp {
    #[display("RLC {_0}")]
    Rlc(RegOrPointer),
    #[display("RLCA")]
    Rlca,
    #[display("RRC {_0}")]
    Rrc(RegOrPointer),
    #[display("RRCA")]
    Rrca,
    #[display("RL {_0}")]
    Rl(RegOrPointer),
    #[display("RLA")]
    Rla,
    #[display("RR {_0}")]
    Rr(RegOrPointer),
    #[display("RRA")]
    Rra,
    #[display("SLA {_0}")]
    Sla(RegOrPointer),
    #[display("SRA {_0}")]
    Sra(RegOrPointer),
    #[display("SWAP {_0}")]
    Swap(RegOrPointer),
    #[display("SRL {_0}")]
    Srl(RegOrPointer),
}

impl BitShiftOp {
    /// The base cost in clock cycles.
    pub fn cycles(&self) -> u8 {
        match self {
            BitShiftOp::Rlca | BitShiftOp::Rla | BitShiftOp::Rrca | BitShiftOp::Rra => 4,
            BitShiftOp::Rlc(reg)
            | BitShiftOp::Rrc(reg)
            | BitShiftOp::Rl(reg)
            | BitShiftOp::Rr(reg)
            | BitShiftOp::Sla(reg)
            | BitShiftOp::Sra(reg)
            | BitShiftOp::Swap(reg)
            | BitShiftOp::Srl(reg) => 8 + 8 * (reg.is_pointer() as u8),
        }
    }

    /// The encoded length in bytes, op code and operands included.
    pub const fn size(&self) -> u8 {
        match self {
            BitShiftOp::Rlca | BitShiftOp::Rla | BitShiftOp::Rrca | BitShiftOp::Rra => 1,
            _ => 2,
        }
    }

    /// The operand being shifted. `None` means the accumulator.
    pub fn target(&self) -> Option<RegOrPointer> {
        match *self {
            BitShiftOp::Rlca | BitShiftOp::Rla | BitShiftOp::Rrca | BitShiftOp::Rra => None,
            BitShiftOp::Rlc(reg)
            | BitShiftOp::Rrc(reg)
            | BitShiftOp::Rl(reg)
            | BitShiftOp::Rr(reg)
            | BitShiftOp::Sla(reg)
            | BitShiftOp::Sra(reg)
            | BitShiftOp::Swap(reg)
            | BitShiftOp::Srl(reg) => Some(reg),
        }
    }

    /// Shifts `byte`, returning the result and the bit that falls into the carry flag.
    pub fn apply(&self, byte: u8, carry: bool) -> (u8, bool) {
        let carry = carry as u8;
        let high = check_bit_const::<7>(byte);
        let low = check_bit_const::<0>(byte);
        match self {
            BitShiftOp::Rlc(_) | BitShiftOp::Rlca => (byte.rotate_left(1), high),
            BitShiftOp::Rrc(_) | BitShiftOp::Rrca => (byte.rotate_right(1), low),
            BitShiftOp::Rl(_) | BitShiftOp::Rla => ((byte << 1) | carry, high),
            BitShiftOp::Rr(_) | BitShiftOp::Rra => ((byte >> 1) | (carry << 7), low),
            BitShiftOp::Sla(_) => (byte << 1, high),
            BitShiftOp::Sra(_) => ((byte >> 1) | (byte & 0x80), low),
            BitShiftOp::Swap(_) => (byte.rotate_left(4), false),
            BitShiftOp::Srl(_) => (byte >> 1, low),
        }
    }
}
