use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::rom::ControllerKind;

/// The value whose low nibble opens the cartridge RAM gate.
const RAM_ENABLE_SENTINEL: u8 = 0x0A;

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum BankingMode {
    #[default]
    Simple = 0,
    Advanced = 1,
}

impl BankingMode {
    fn from_byte(value: u8) -> Self {
        match value & 0x1 {
            0 => Self::Simple,
            _ => Self::Advanced,
        }
    }
}

/// Decides which ROM bank is visible at 0x4000..=0x7FFF and whether cartridge RAM can be
/// touched. Writes into the ROM region are routed here and dispatched on the controller kind.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankController {
    kind: ControllerKind,
    /// The number of 16 KiB banks the header declares.
    rom_banks: usize,
    /// Never zero. Selecting bank 0 aliases to bank 1.
    rom_bank: usize,
    ram_enabled: bool,
    mode: BankingMode,
}

impl BankController {
    pub fn new(kind: ControllerKind, rom_banks: usize) -> Self {
        Self {
            kind,
            rom_banks: rom_banks.max(2),
            rom_bank: 1,
            ram_enabled: false,
            mode: BankingMode::Simple,
        }
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    pub fn rom_bank(&self) -> usize {
        self.rom_bank
    }

    pub fn ram_enabled(&self) -> bool {
        self.ram_enabled
    }

    pub fn mode(&self) -> BankingMode {
        self.mode
    }

    /// Handles a CPU write somewhere in 0x0000..=0x7FFF.
    pub fn write(&mut self, addr: u16, val: u8) {
        match self.kind {
            ControllerKind::Direct => {}
            ControllerKind::Banked => self.banked_write(addr, val),
        }
    }

    fn banked_write(&mut self, addr: u16, val: u8) {
        match addr >> 12 {
            0x0 | 0x1 => self.ram_enabled = (val & 0x0F) == RAM_ENABLE_SENTINEL,
            0x2 | 0x3 => self.select_bank(val),
            0x6 | 0x7 => self.mode = BankingMode::from_byte(val),
            _ => {}
        }
    }

    /// Selects the active ROM bank from the low five bits of a raw register write.
    pub fn select_bank(&mut self, raw: u8) {
        self.set_rom_bank((raw & 0x1F) as usize);
    }

    /// Points the switchable region at `bank`. Bank 0 maps to bank 1, and anything past the
    /// declared bank count is reported and clamped to the last bank.
    pub fn set_rom_bank(&mut self, bank: usize) {
        let bank = bank.max(1);
        self.rom_bank = if bank >= self.rom_banks {
            let clamped = self.rom_banks - 1;
            warn!(
                "ROM bank {bank} selected but the cartridge only has {} banks, using bank {clamped}",
                self.rom_banks
            );
            clamped
        } else {
            bank
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banked() -> BankController {
        BankController::new(ControllerKind::Banked, 16)
    }

    #[test]
    fn bank_select_writes() {
        let mut mbc = banked();
        mbc.write(0x2000, 5);
        assert_eq!(mbc.rom_bank(), 5);
        mbc.write(0x3FFF, 0);
        assert_eq!(mbc.rom_bank(), 1);
        // Only the low five bits are wired
        mbc.write(0x2100, 0xE3);
        assert_eq!(mbc.rom_bank(), 3);
    }

    #[test_log::test]
    fn out_of_range_banks_are_clamped() {
        let mut mbc = banked();
        mbc.write(0x2000, 0x1F);
        assert_eq!(mbc.rom_bank(), 15);
    }

    #[test]
    fn ram_gate_needs_sentinel_nibble() {
        let mut mbc = banked();
        assert!(!mbc.ram_enabled());
        mbc.write(0x0000, 0x0A);
        assert!(mbc.ram_enabled());
        mbc.write(0x1FFF, 0xFA);
        assert!(mbc.ram_enabled());
        mbc.write(0x1000, 0x0B);
        assert!(!mbc.ram_enabled());
    }

    #[test]
    fn mode_register() {
        let mut mbc = banked();
        mbc.write(0x6000, 0x01);
        assert_eq!(mbc.mode(), BankingMode::Advanced);
        mbc.write(0x7000, 0x02);
        assert_eq!(mbc.mode(), BankingMode::Simple);
    }

    #[test]
    fn direct_controller_ignores_writes() {
        let mut mbc = BankController::new(ControllerKind::Direct, 2);
        mbc.write(0x2000, 0x01);
        mbc.write(0x0000, 0x0A);
        assert_eq!(mbc.rom_bank(), 1);
        assert!(!mbc.ram_enabled());
    }
}
