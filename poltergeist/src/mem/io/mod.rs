//! Addresses and power-on values of the memory mapped I/O registers (0xFF00..=0xFF7F and IE).

use crate::input::Buttons;

pub mod timers;

/// Joypad select and state
pub const P1: u16 = 0xFF00;
pub const DIV: u16 = 0xFF04;
pub const TIMA: u16 = 0xFF05;
pub const TMA: u16 = 0xFF06;
pub const TAC: u16 = 0xFF07;
/// Pending interrupt flags
pub const IF: u16 = 0xFF0F;

pub const NR10: u16 = 0xFF10;
pub const NR11: u16 = 0xFF11;
pub const NR12: u16 = 0xFF12;
pub const NR13: u16 = 0xFF13;
pub const NR14: u16 = 0xFF14;
pub const NR21: u16 = 0xFF16;
pub const NR22: u16 = 0xFF17;
pub const NR23: u16 = 0xFF18;
pub const NR24: u16 = 0xFF19;
pub const NR30: u16 = 0xFF1A;
pub const NR31: u16 = 0xFF1B;
pub const NR32: u16 = 0xFF1C;
pub const NR33: u16 = 0xFF1D;
pub const NR34: u16 = 0xFF1E;
pub const NR41: u16 = 0xFF20;
pub const NR42: u16 = 0xFF21;
pub const NR43: u16 = 0xFF22;
pub const NR44: u16 = 0xFF23;
pub const NR50: u16 = 0xFF24;
pub const NR51: u16 = 0xFF25;
/// Sound on/off and per-channel status
pub const NR52: u16 = 0xFF26;
pub const WAVE_RAM: u16 = 0xFF30;

pub const LCDC: u16 = 0xFF40;
pub const STAT: u16 = 0xFF41;
pub const SCY: u16 = 0xFF42;
pub const SCX: u16 = 0xFF43;
pub const LY: u16 = 0xFF44;
pub const LYC: u16 = 0xFF45;
pub const DMA: u16 = 0xFF46;
pub const BGP: u16 = 0xFF47;
pub const OBP0: u16 = 0xFF48;
pub const OBP1: u16 = 0xFF49;
pub const WY: u16 = 0xFF4A;
pub const WX: u16 = 0xFF4B;
/// Enabled interrupts
pub const IE: u16 = 0xFFFF;

/// The I/O registers that do not power on as 0xFF.
pub const POWER_ON_REGISTERS: [(u16, u8); 31] = [
    (TIMA, 0x00),
    (TMA, 0x00),
    (TAC, 0x00),
    (NR10, 0x80),
    (NR11, 0xBF),
    (NR12, 0xF3),
    (NR14, 0xBF),
    (NR21, 0x3F),
    (NR22, 0x00),
    (NR24, 0xBF),
    (NR30, 0x7F),
    (NR31, 0xFF),
    (NR32, 0x9F),
    (NR34, 0xBF),
    (NR41, 0xFF),
    (NR42, 0x00),
    (NR43, 0x00),
    (NR44, 0xBF),
    (NR50, 0x77),
    (NR51, 0xF3),
    (NR52, 0xF1),
    (LCDC, 0x91),
    (SCY, 0x00),
    (SCX, 0x00),
    (LYC, 0x00),
    (BGP, 0xFC),
    (OBP0, 0xFF),
    (OBP1, 0xFF),
    (WY, 0x00),
    (WX, 0x00),
    (IE, 0x00),
];

/// Used to write a new byte into an existing byte where one or more of the bits are read-only.
/// The `mask` should have writable bits set and read-only bits unset. E.g. if the bottom nibble is
/// read-only, the mask should be 0xF0.
pub fn selective_write(existing: &mut u8, mask: u8, new: u8) {
    let masked_existing = *existing & (!mask);
    let masked_new = new & mask;
    *existing = masked_existing | masked_new;
}

/// Computes what P1 reads as, given the select bits last written and the held buttons.
/// Bit 5 low selects the action buttons, bit 4 low selects the d-pad. With neither selected the
/// register floats high.
pub fn joypad_value(select: u8, pressed: Buttons) -> u8 {
    let select = select & 0x30;
    let mut low = 0x0F;
    if select & 0x20 == 0 {
        low &= pressed.button_nibble();
    }
    if select & 0x10 == 0 {
        low &= pressed.direction_nibble();
    }
    if select == 0x30 {
        0xFF
    } else {
        0xC0 | select | low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selective_write_keeps_read_only_bits() {
        let mut stat = 0b1000_0110;
        selective_write(&mut stat, 0x78, 0xFF);
        assert_eq!(stat, 0b1111_1110);
    }

    #[test]
    fn joypad_selection() {
        let pressed = Buttons::B | Buttons::DOWN;
        assert_eq!(joypad_value(0x10, pressed), 0xDD);
        assert_eq!(joypad_value(0x20, pressed), 0xE7);
        assert_eq!(joypad_value(0x30, pressed), 0xFF);
    }
}
