use super::*;

/// Every flavor of LD, LDH, PUSH and POP. Displays use the usual `dest, src` operand order.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum LoadOp {
    /// `LD r, r'` over the 0x40..=0x7F block, minus 0x76 which is HALT.
    #[display("LD {dest}, {src}")]
    Basic {
        dest: RegOrPointer,
        src: RegOrPointer,
    },
    #[display("LD {_0}, 0x{_1:0>4X}")]
    Immediate16(WideReg, u16),
    #[display("LD {_0}, 0x{_1:0>2X}")]
    Immediate(RegOrPointer, u8),
    /// `LD A, (rr)`, including the post-increment and post-decrement forms of HL.
    #[display("LD A, ({_0})")]
    LoadFromPair(PairPointer),
    #[display("LD ({_0}), A")]
    StoreToPair(PairPointer),
    /// Writes SP little endian at the address.
    #[display("LD (0x{_0:0>4X}), SP")]
    StoreSp(u16),
    #[display("LD SP, HL")]
    SpFromHl,
    /// HL = SP + e8, with the flags of a byte-wide add of the low halves.
    #[display("LD HL, SP{_0:+}")]
    HlFromSpOffset(i8),
    #[display("POP {_0}")]
    Pop(StackReg),
    #[display("PUSH {_0}")]
    Push(StackReg),
    /// Writes A to 0xFF00 + n.
    #[display("LDH (0xFF{_0:0>2X}), A")]
    StoreHigh(u8),
    #[display("LDH A, (0xFF{_0:0>2X})")]
    LoadHigh(u8),
    #[display("LDH (C), A")]
    StoreHighC,
    #[display("LDH A, (C)")]
    LoadHighC,
    #[display("LD (0x{ptr:0>4X}), A")]
    StoreA { ptr: u16 },
    #[display("LD A, (0x{ptr:0>4X})")]
    LoadA { ptr: u16 },
}

impl LoadOp {
    /// The base cost in clock cycles.
    pub fn cycles(&self) -> u8 {
        match self {
            LoadOp::Basic {
                dest: RegOrPointer::Pointer,
                ..
            }
            | LoadOp::Basic {
                src: RegOrPointer::Pointer,
                ..
            } => 8,
            LoadOp::Basic { .. } => 4,
            LoadOp::Immediate16(_, _) => 12,
            LoadOp::Immediate(RegOrPointer::Pointer, _) => 12,
            LoadOp::Immediate(_, _) => 8,
            LoadOp::LoadFromPair(_) => 8,
            LoadOp::StoreToPair(_) => 8,
            LoadOp::StoreSp(_) => 20,
            LoadOp::SpFromHl => 8,
            LoadOp::HlFromSpOffset(_) => 12,
            LoadOp::Pop(_) => 12,
            LoadOp::Push(_) => 16,
            LoadOp::StoreHigh(_) => 12,
            LoadOp::LoadHigh(_) => 12,
            LoadOp::StoreHighC => 8,
            LoadOp::LoadHighC => 8,
            LoadOp::StoreA { .. } => 16,
            LoadOp::LoadA { .. } => 16,
        }
    }

    /// The encoded length in bytes, op code and operands included.
    pub const fn size(&self) -> u8 {
        match self {
            LoadOp::Basic { .. } => 1,
            LoadOp::Immediate16(_, _) => 3,
            LoadOp::Immediate(_, _) => 2,
            LoadOp::LoadFromPair(_) => 1,
            LoadOp::StoreToPair(_) => 1,
            LoadOp::StoreSp(_) => 3,
            LoadOp::SpFromHl => 1,
            LoadOp::HlFromSpOffset(_) => 2,
            LoadOp::Pop(_) => 1,
            LoadOp::Push(_) => 1,
            LoadOp::StoreHigh(_) => 2,
            LoadOp::LoadHigh(_) => 2,
            LoadOp::StoreHighC => 1,
            LoadOp::LoadHighC => 1,
            LoadOp::StoreA { .. } => 3,
            LoadOp::LoadA { .. } => 3,
        }
    }
}
