use std::fmt::Debug;
use std::ops::Index;
use std::ops::IndexMut;

use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;
use tracing::debug;
use tracing::info;
use tracing::trace;

use crate::apu::Apu;
use crate::cpu::check_bit_const;
use crate::input::Buttons;
use crate::instruction::InterruptOp;
use crate::rom::Cartridge;

pub mod io;
mod mbc;

pub use mbc::BankController;
pub use mbc::BankingMode;

use io::*;

/// The size of the boot image mapped over the bottom of the address space at power on.
pub const BOOT_ROM_SIZE: usize = 0x100;

/// The number of bytes an OAM DMA transfer copies.
const DMA_LENGTH: u16 = 0xA0;

/// Byte access to an address space. The CPU runs against this, so tests can hand it a flat
/// buffer instead of the full memory map.
pub trait MemoryLike {
    fn read_byte(&self, addr: u16) -> u8;

    fn write_byte(&mut self, addr: u16, val: u8);

    fn clear_interrupt_req(&mut self, _op: InterruptOp) {}
}

/// The flat 64 KiB backing store. Indexing it bypasses every side effect, so only the components
/// that own a region (or the save state code) should touch it directly.
#[serde_as]
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ram(#[serde_as(as = "serde_with::Bytes")] Vec<u8>);

impl Ram {
    pub const SIZE: usize = 0x10000;

    pub fn new() -> Self {
        Self(vec![0; Self::SIZE])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ram({} bytes)", self.0.len())
    }
}

impl Index<u16> for Ram {
    type Output = u8;

    fn index(&self, addr: u16) -> &Self::Output {
        &self.0[addr as usize]
    }
}

impl IndexMut<u16> for Ram {
    fn index_mut(&mut self, addr: u16) -> &mut Self::Output {
        &mut self.0[addr as usize]
    }
}

/// The bus. Every CPU access goes through [`MemoryLike::read_byte`] and
/// [`MemoryLike::write_byte`], which decode the address to exactly one owner and apply the
/// register side effects.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMap {
    ram: Ram,
    cart: Cartridge,
    mbc: BankController,
    /// Battery backed cartridge RAM, visible at 0xA000 while the controller enables it.
    #[serde_as(as = "serde_with::Bytes")]
    ext_ram: Vec<u8>,
    pub apu: Apu,
    joypad: Buttons,
    #[serde_as(as = "Option<serde_with::Bytes>")]
    boot_rom: Option<Vec<u8>>,
    booting: bool,
    /// Set by a write to DIV until the timers pick it up.
    div_reset: bool,
}

impl MemoryMap {
    pub fn new(cart: Cartridge) -> Self {
        let header = cart.header();
        let mbc = BankController::new(header.controller, header.rom_banks);
        let ext_ram = vec![0; header.ram_size];
        let mut digest = Self {
            ram: Ram::new(),
            cart,
            mbc,
            ext_ram,
            apu: Apu::new(),
            joypad: Buttons::NONE,
            boot_rom: None,
            booting: false,
            div_reset: false,
        };
        digest.reset();
        digest
    }

    /// Installs a boot image. It takes effect on the next reset.
    pub fn set_boot_rom(&mut self, boot: Vec<u8>) {
        self.boot_rom = Some(boot);
    }

    /// Puts every region and register back into its power on state. Cartridge RAM survives, the
    /// way a battery would keep it.
    pub fn reset(&mut self) {
        let ram = self.ram.as_mut_slice();
        ram.fill(0);
        ram[0xA000..0xC000].fill(0xFF);
        ram[0xFF00..0xFF80].fill(0xFF);
        for (addr, val) in POWER_ON_REGISTERS {
            self.ram[addr] = val;
        }
        self.ram[IF] = 0xE1;
        self.ram[STAT] = 0x80;
        self.ram[LY] = 0x00;

        let header = self.cart.header();
        self.mbc = BankController::new(header.controller, header.rom_banks);
        let bank_zero = &self.cart.bytes()[..self.cart.bytes().len().min(0x4000)];
        self.ram.as_mut_slice()[..bank_zero.len()].copy_from_slice(bank_zero);

        let sample_rate = self.apu.mixer.sample_rate;
        self.apu = Apu::new();
        self.apu.mixer.sample_rate = sample_rate;
        self.apu.restore_from_registers(&self.ram);
        self.joypad = Buttons::NONE;
        self.div_reset = false;

        self.booting = false;
        if let Some(boot) = &self.boot_rom {
            let len = boot.len().min(BOOT_ROM_SIZE);
            self.ram.as_mut_slice()[..len].copy_from_slice(&boot[..len]);
            self.booting = true;
        }
    }

    /// Reallocates the bank controller and cartridge RAM, then resets.
    pub fn hard_reset(&mut self) {
        self.ext_ram = vec![0; self.cart.header().ram_size];
        self.reset();
    }

    pub fn booting(&self) -> bool {
        self.booting
    }

    /// Unmaps the boot image, restoring the cartridge's own first 256 bytes.
    pub fn finish_boot(&mut self) {
        let len = self.cart.bytes().len().min(BOOT_ROM_SIZE);
        let (ram, rom) = (self.ram.as_mut_slice(), self.cart.bytes());
        ram[..len].copy_from_slice(&rom[..len]);
        self.booting = false;
        info!("Boot image finished, handing off to the cartridge");
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cart
    }

    pub fn mbc(&self) -> &BankController {
        &self.mbc
    }

    pub fn mbc_mut(&mut self) -> &mut BankController {
        &mut self.mbc
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut Ram {
        &mut self.ram
    }

    pub fn ext_ram(&self) -> &[u8] {
        &self.ext_ram
    }

    pub fn lcd_enabled(&self) -> bool {
        check_bit_const::<7>(self.ram[LCDC])
    }

    /// The PPU mode as exposed in the bottom bits of STAT.
    fn ppu_mode_bits(&self) -> u8 {
        self.ram[STAT] & 0x03
    }

    /// VRAM is cut off from the CPU while the PPU is drawing.
    pub fn vram_locked(&self) -> bool {
        self.lcd_enabled() && self.ppu_mode_bits() == 3
    }

    /// OAM is cut off from the CPU during the OAM scan and while drawing.
    pub fn oam_locked(&self) -> bool {
        self.lcd_enabled() && self.ppu_mode_bits() >= 2
    }

    pub fn request_interrupt(&mut self, op: InterruptOp) {
        self.ram[IF] |= op.mask();
    }

    /// Returns the highest priority interrupt that is both requested and enabled.
    pub fn pending_interrupt(&self) -> Option<InterruptOp> {
        let pending = self.ram[IE] & self.ram[IF] & 0x1F;
        InterruptOp::PRIORITY
            .into_iter()
            .find(|op| pending & op.mask() != 0)
    }

    pub fn buttons(&self) -> Buttons {
        self.joypad
    }

    /// Updates the held buttons. If a line that the game currently has selected goes low, the
    /// joypad interrupt is requested.
    pub fn set_buttons(&mut self, pressed: Buttons) {
        let old = self.read_byte(P1);
        self.joypad = pressed;
        self.check_joypad_edge(old);
    }

    fn check_joypad_edge(&mut self, old: u8) {
        let new = self.read_byte(P1);
        if (old & !new) & 0x0F != 0 {
            self.request_interrupt(InterruptOp::Joypad);
        }
    }

    /// Copies 160 bytes from `page << 8` into OAM. This happens synchronously on the write.
    fn dma_transfer(&mut self, page: u8) {
        let src = (page as u16) << 8;
        trace!("OAM DMA from 0x{src:0>4X}");
        for i in 0..DMA_LENGTH {
            let byte = self.read_byte(src.wrapping_add(i));
            self.ram[0xFE00 + i] = byte;
        }
    }

    /// Advances the sound unit's sweep, length, and envelope logic.
    pub fn tick_apu(&mut self, cycles: u32) {
        self.apu.tick(cycles, &mut self.ram);
    }

    /// Reports, once, whether DIV was written since the last call.
    pub fn take_div_reset(&mut self) -> bool {
        std::mem::take(&mut self.div_reset)
    }

    /// Rederives the sound unit's duty, sweep, noise and level settings from its registers. The
    /// channel records are left alone.
    pub fn restore_apu(&mut self) {
        self.apu.restore_from_registers(&self.ram);
    }

    pub fn fill_audio(&mut self, out: &mut [i16], muted: bool) {
        self.apu.fill(&self.ram, out, muted);
    }
}

impl MemoryLike for MemoryMap {
    fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.ram[addr],
            0x4000..=0x7FFF => self.cart.read(self.mbc.rom_bank(), addr - 0x4000),
            0x8000..=0x9FFF if self.vram_locked() => 0xFF,
            0xA000..=0xBFFF if self.mbc.ram_enabled() => self
                .ext_ram
                .get((addr - 0xA000) as usize)
                .copied()
                .unwrap_or(0xFF),
            // Echo RAM
            0xE000..=0xFDFF => self.ram[addr - 0x2000],
            0xFE00..=0xFE9F if self.oam_locked() => 0xFF,
            P1 => joypad_value(self.ram[P1], self.joypad),
            IF => self.ram[IF] | 0xE0,
            LY if !self.lcd_enabled() => 0,
            DMA => 0,
            NR13 | NR23 | NR33 => 0,
            NR14 | NR24 | NR34 | NR44 => self.ram[addr] & 0x40,
            NR30 => self.ram[addr] & 0x80,
            _ => self.ram[addr],
        }
    }

    fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF => self.mbc.write(addr, val),
            0x8000..=0x9FFF => {
                if !self.vram_locked() {
                    self.ram[addr] = val
                }
            }
            0xA000..=0xBFFF => {
                if self.mbc.ram_enabled() {
                    if let Some(byte) = self.ext_ram.get_mut((addr - 0xA000) as usize) {
                        *byte = val;
                    }
                }
            }
            0xE000..=0xFDFF => self.ram[addr - 0x2000] = val,
            0xFE00..=0xFE9F => {
                if !self.oam_locked() {
                    self.ram[addr] = val
                }
            }
            P1 => {
                let old = self.read_byte(P1);
                self.ram[P1] = 0xC0 | (val & 0x30);
                self.check_joypad_edge(old);
            }
            DIV => {
                self.ram[DIV] = 0;
                self.div_reset = true;
            }
            LY => self.ram[LY] = 0,
            IF => self.ram[IF] = val & 0x1F,
            STAT => selective_write(&mut self.ram[STAT], 0xF8, val),
            DMA => {
                self.ram[DMA] = val;
                self.dma_transfer(val);
            }
            NR10..=NR52 => self.apu.write_register(addr, val, &mut self.ram),
            0xFF03 | 0xFF08..=0xFF0E | 0xFF4C..=0xFF4F | 0xFF51..=0xFF7F => {
                debug!("Write of 0x{val:0>2X} to unmapped I/O address 0x{addr:0>4X}");
                self.ram[addr] = val;
            }
            _ => self.ram[addr] = val,
        }
    }

    fn clear_interrupt_req(&mut self, op: InterruptOp) {
        self.ram[IF] &= !op.mask();
    }
}

impl Index<u16> for MemoryMap {
    type Output = u8;

    fn index(&self, addr: u16) -> &Self::Output {
        &self.ram[addr]
    }
}

impl IndexMut<u16> for MemoryMap {
    fn index_mut(&mut self, addr: u16) -> &mut Self::Output {
        &mut self.ram[addr]
    }
}

#[cfg(test)]
impl MemoryMap {
    /// A memory map around a blank 32 KiB cartridge with no controller.
    pub fn construct() -> Self {
        Self::new(Cartridge::new(vec![0; 0x8000]).unwrap())
    }
}

#[cfg(test)]
impl MemoryLike for Vec<u8> {
    fn read_byte(&self, addr: u16) -> u8 {
        self[addr as usize]
    }

    fn write_byte(&mut self, addr: u16, val: u8) {
        self[addr as usize] = val;
    }

    fn clear_interrupt_req(&mut self, op: InterruptOp) {
        self[IF as usize] &= !op.mask();
    }
}
