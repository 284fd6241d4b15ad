#![allow(dead_code)]

use poltergeist::Cartridge;
use poltergeist::Gameboy;

pub const ROM_BANK_SIZE: usize = 0x4000;

/// Builds a cartridge image with a valid header and `program` placed at the entry point. Every
/// switchable bank starts with its own index so bank switching is visible from the bus.
pub fn build_rom(controller: u8, size_code: u8, program: &[u8]) -> Vec<u8> {
    let banks = 2usize << size_code;
    let mut rom = vec![0; banks * ROM_BANK_SIZE];
    rom[0x134..0x13B].copy_from_slice(b"WRAITHS");
    rom[0x147] = controller;
    rom[0x148] = size_code;
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    for bank in 1..banks {
        rom[bank * ROM_BANK_SIZE] = bank as u8;
    }
    rom
}

pub fn boot(program: &[u8]) -> Gameboy {
    Gameboy::new(Cartridge::new(build_rom(0x00, 0, program)).unwrap())
}

/// A banked cartridge with 16 ROM banks that spins in place.
pub fn banked() -> Gameboy {
    Gameboy::new(Cartridge::new(build_rom(0x01, 3, &[0x18, 0xFE])).unwrap())
}
