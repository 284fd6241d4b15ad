use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;
use tracing::info;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;

/// The size of a ROM bank, 16 KiB.
pub const ROM_BANK_SIZE: usize = 0x4000;

/// The kind of bank controller soldered onto a cartridge.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
pub enum ControllerKind {
    /// ROM is wired straight onto the bus and writes below 0x8000 go nowhere.
    #[display("ROM only")]
    Direct,
    /// The first generation banking chip: a RAM gate, a 5-bit ROM bank register and a mode bit.
    #[display("MBC1")]
    Banked,
}

impl ControllerKind {
    fn from_code(code: u8) -> Self {
        match code {
            0x01..=0x03 => Self::Banked,
            0x00 | 0x08 | 0x09 => Self::Direct,
            n => {
                warn!("Unsupported controller type 0x{n:0>2X}, treating the cartridge as ROM only");
                Self::Direct
            }
        }
    }
}

/// The metadata read out of the cartridge header (0x0100..=0x014F) once at load time.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeHeader {
    /// The region between 0x134 and 0x142, cut at the first NUL.
    pub title: heapless::String<15>,
    /// The raw byte at 0x147.
    pub controller_code: u8,
    pub controller: ControllerKind,
    /// Derived from the byte at 0x148. Each bank is 16 KiB.
    pub rom_banks: usize,
    /// Derived from the byte at 0x149, in bytes.
    pub ram_size: usize,
}

impl CartridgeHeader {
    pub const START_ADDR: usize = 0x100;
    pub const END_ADDR: usize = 0x14F;

    pub fn extract_from_rom(rom: &[u8]) -> Result<Self> {
        if rom.len() <= Self::END_ADDR {
            return Err(Error::invalid(format!(
                "cartridge is {} bytes, too short to hold a header",
                rom.len()
            )));
        }
        let mut title = heapless::String::new();
        for &b in rom[0x134..=0x142].iter().take_while(|b| **b != 0) {
            // Capacity is only exceeded by non-ASCII bytes, which are dropped.
            let _ = title.push(b as char);
        }
        let controller_code = rom[0x147];
        let rom_banks = match rom[0x148] {
            n @ 0..=8 => 2usize << n,
            n => {
                let banks = rom.len().div_ceil(ROM_BANK_SIZE).max(2);
                warn!("Unknown ROM size code 0x{n:0>2X}, assuming {banks} banks");
                banks
            }
        };
        let ram_size = match rom[0x149] {
            0 => 0,
            1 => 0x800,
            2 => 0x2000,
            3 => 0x8000,
            4 => 0x20000,
            5 => 0x10000,
            n => {
                warn!("Unknown RAM size code 0x{n:0>2X}, assuming no cartridge RAM");
                0
            }
        };
        Ok(Self {
            title,
            controller_code,
            controller: ControllerKind::from_code(controller_code),
            rom_banks,
            ram_size,
        })
    }
}

/// The raw ROM image of a game together with its parsed header.
#[serde_as]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cartridge {
    #[serde_as(as = "serde_with::Bytes")]
    rom: Vec<u8>,
    header: CartridgeHeader,
}

impl Cartridge {
    pub fn new(rom: Vec<u8>) -> Result<Self> {
        let header = CartridgeHeader::extract_from_rom(&rom)?;
        info!(
            "Loaded \"{}\": {} controller, {} ROM banks, {} bytes of RAM",
            header.title, header.controller, header.rom_banks, header.ram_size
        );
        Ok(Self { rom, header })
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    /// Reads a byte from the given bank. Reads past the end of the image float high.
    pub fn read(&self, bank: usize, offset: u16) -> u8 {
        self.rom
            .get(bank * ROM_BANK_SIZE + offset as usize)
            .copied()
            .unwrap_or(0xFF)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.rom
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a blank cartridge image with a valid header and the given program at 0x100.
    pub(crate) fn build_rom(controller: u8, size_code: u8, program: &[u8]) -> Vec<u8> {
        let mut rom = vec![0; (2usize << size_code) * ROM_BANK_SIZE];
        rom[0x134..0x13A].copy_from_slice(b"SPOOKY");
        rom[0x147] = controller;
        rom[0x148] = size_code;
        rom[0x149] = 0x02;
        rom[0x100..0x100 + program.len()].copy_from_slice(program);
        rom
    }

    #[test]
    fn parses_header_fields() {
        let cart = Cartridge::new(build_rom(0x01, 3, &[])).unwrap();
        let header = cart.header();
        assert_eq!(cart.title(), "SPOOKY");
        assert_eq!(header.controller, ControllerKind::Banked);
        assert_eq!(header.rom_banks, 16);
        assert_eq!(header.ram_size, 0x2000);
    }

    #[test]
    fn title_uses_all_fifteen_bytes_without_nul() {
        let mut rom = build_rom(0x00, 0, &[]);
        rom[0x134..=0x142].copy_from_slice(b"ABCDEFGHIJKLMNO");
        let header = CartridgeHeader::extract_from_rom(&rom).unwrap();
        assert_eq!(header.title.as_str(), "ABCDEFGHIJKLMNO");
        assert_eq!(header.controller, ControllerKind::Direct);
        assert_eq!(header.rom_banks, 2);
    }

    #[test]
    fn short_images_are_rejected() {
        assert!(matches!(
            Cartridge::new(vec![0; 0x100]),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn reads_past_the_image_float_high() {
        let cart = Cartridge::new(build_rom(0x00, 0, &[0x3E])).unwrap();
        assert_eq!(cart.read(0, 0x100), 0x3E);
        assert_eq!(cart.read(7, 0x0000), 0xFF);
    }
}
