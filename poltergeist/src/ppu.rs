use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;
use tracing::trace;

use crate::cpu::check_bit_const;
use crate::instruction::InterruptOp;
use crate::mem::io::{BGP, LCDC, LY, LYC, OBP0, OBP1, SCX, SCY, STAT, WX, WY};
use crate::mem::MemoryMap;

// Notes:
// A tile is 16 bytes, which means that each line is 2 bytes.
// Every pixel has a color-depth of 2. The nth bit of the first byte holds the nth pixel's least
// significant bit of the color depth. The most significant bit is in the corresponding bit of
// second byte.

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

/// Every line, visible or not, takes this many cycles.
pub const LINE_CYCLES: u32 = 456;
/// 154 lines of 456 cycles.
pub const FRAME_CYCLES: u32 = LINE_CYCLES * 154;

const VBLANK_LINE: u8 = 144;
const LAST_LINE: u8 = 153;
const OAM_START: u16 = 0xFE00;
const SPRITE_COUNT: u16 = 40;

/// The PPU modes. The discriminants are the values exposed in the bottom two bits of STAT.
#[derive(
    Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
pub enum PpuMode {
    HBlank = 0,
    VBlank = 1,
    #[default]
    OamScan = 2,
    Drawing = 3,
}

impl PpuMode {
    /// The number of cycles spent in this mode before the next transition. For VBlank this is a
    /// single line.
    pub const fn cycles(self) -> u32 {
        match self {
            PpuMode::OamScan => 80,
            PpuMode::Drawing => 172,
            PpuMode::HBlank => 204,
            PpuMode::VBlank => LINE_CYCLES,
        }
    }

    /// The STAT bit that requests an LCD interrupt when this mode is entered.
    const fn stat_interrupt_mask(self) -> u8 {
        match self {
            PpuMode::HBlank => 0x08,
            PpuMode::VBlank => 0x10,
            PpuMode::OamScan => 0x20,
            PpuMode::Drawing => 0x00,
        }
    }
}

/// The Pixel Processing Unit. A scanline state machine driven by the cycle count of each CPU
/// step. Lines are rendered in one go when their HBlank ends.
#[serde_as]
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ppu {
    mode: PpuMode,
    /// Cycles accumulated since the current mode was entered.
    dots: u32,
    /// Shade indices (0..=3) after the palettes are applied, row major.
    #[serde_as(as = "serde_with::Bytes")]
    screen: Vec<u8>,
    /// The raw background/window color of each pixel of the current line. Used for the sprite
    /// priority bit.
    #[serde_as(as = "serde_with::Bytes")]
    bg_line: Vec<u8>,
    /// The OAM Y value of the sprite that last claimed each column of the current line.
    #[serde_as(as = "serde_with::Bytes")]
    sprite_y: Vec<u8>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            mode: PpuMode::OamScan,
            dots: 0,
            screen: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            bg_line: vec![0; SCREEN_WIDTH],
            sprite_y: vec![0; SCREEN_WIDTH],
        }
    }

    /// Returns to the start of line 0 and publishes the mode in STAT.
    pub fn reset(&mut self, mem: &mut MemoryMap) {
        *self = Self::new();
        mem[LY] = 0;
        self.write_mode(mem);
    }

    /// Picks the mode back up from STAT at the start of that mode. Used after memory has been
    /// replaced wholesale by a save state.
    pub fn restore_from_registers(&mut self, mem: &MemoryMap) {
        self.mode = match mem[STAT] & 0x03 {
            0 => PpuMode::HBlank,
            1 => PpuMode::VBlank,
            2 => PpuMode::OamScan,
            _ => PpuMode::Drawing,
        };
        self.dots = 0;
    }

    pub fn mode(&self) -> PpuMode {
        self.mode
    }

    /// The 160x144 frame as shade indices, row major. 0 is the lightest shade.
    pub fn screen(&self) -> &[u8] {
        &self.screen
    }

    /// Advances the state machine by `cycles`. Returns `true` if VBlank was entered.
    pub fn tick(&mut self, cycles: u32, mem: &mut MemoryMap) -> bool {
        self.dots += cycles;
        let mut vblank = false;
        while self.dots >= self.mode.cycles() {
            self.dots -= self.mode.cycles();
            vblank |= self.advance(mem);
        }
        vblank
    }

    fn advance(&mut self, mem: &mut MemoryMap) -> bool {
        match self.mode {
            PpuMode::OamScan => self.enter(PpuMode::Drawing, mem),
            PpuMode::Drawing => self.enter(PpuMode::HBlank, mem),
            PpuMode::HBlank => {
                let line = mem[LY];
                if mem.lcd_enabled() && usize::from(line) < SCREEN_HEIGHT {
                    self.render_line(line, mem);
                    if check_bit_const::<1>(mem[LCDC]) {
                        self.draw_sprites(line, mem);
                    }
                }
                mem[LY] = line.wrapping_add(1);
                self.check_coincidence(mem);
                if mem[LY] == VBLANK_LINE {
                    if mem.lcd_enabled() {
                        mem.request_interrupt(InterruptOp::VBlank);
                    }
                    self.enter(PpuMode::VBlank, mem);
                    return true;
                }
                self.enter(PpuMode::OamScan, mem);
            }
            PpuMode::VBlank => {
                if mem[LY] >= LAST_LINE {
                    mem[LY] = 0;
                    self.enter(PpuMode::OamScan, mem);
                } else {
                    mem[LY] += 1;
                }
                self.check_coincidence(mem);
            }
        }
        false
    }

    fn enter(&mut self, mode: PpuMode, mem: &mut MemoryMap) {
        trace!("PPU entering {mode} on line {}", mem[LY]);
        self.mode = mode;
        self.write_mode(mem);
        if mem.lcd_enabled() && mem[STAT] & mode.stat_interrupt_mask() != 0 {
            mem.request_interrupt(InterruptOp::LCD);
        }
    }

    fn write_mode(&self, mem: &mut MemoryMap) {
        mem[STAT] = (mem[STAT] & !0x03) | self.mode as u8;
    }

    fn check_coincidence(&self, mem: &mut MemoryMap) {
        if mem[LY] == mem[LYC] {
            mem[STAT] |= 0x04;
            if check_bit_const::<6>(mem[STAT]) {
                mem.request_interrupt(InterruptOp::LCD);
            }
        } else {
            mem[STAT] &= !0x04;
        }
    }

    fn render_line(&mut self, line: u8, mem: &MemoryMap) {
        let lcdc = mem[LCDC];
        let bg_map = if check_bit_const::<3>(lcdc) { 0x9C00 } else { 0x9800 };
        let window_map = if check_bit_const::<6>(lcdc) { 0x9C00 } else { 0x9800 };
        let show_window = check_bit_const::<5>(lcdc);
        let signed = !check_bit_const::<4>(lcdc);
        let (sx, sy) = (mem[SCX], mem[SCY]);
        // WX below 7 pushes the window's left edge off screen rather than wrapping it
        let wx = i16::from(mem[WX]) - 7;
        let wy = mem[WY];
        let bgp = mem[BGP];

        let row = usize::from(line) * SCREEN_WIDTH;
        for i in 0..SCREEN_WIDTH as u8 {
            let x = usize::from(i);
            self.sprite_y[x] = 0;
            let window_x = i16::from(i) - wx;
            let color = if show_window && line >= wy && window_x >= 0 {
                tile_pixel(mem, window_map, signed, window_x as u8, line - wy)
            } else {
                tile_pixel(mem, bg_map, signed, i.wrapping_add(sx), line.wrapping_add(sy))
            };
            self.bg_line[x] = color;
            self.screen[row + x] = shade(bgp, color);
        }
    }

    fn draw_sprites(&mut self, line: u8, mem: &MemoryMap) {
        let tall = check_bit_const::<2>(mem[LCDC]);
        let height: i16 = if tall { 16 } else { 8 };
        let row = usize::from(line) * SCREEN_WIDTH;
        let line = i16::from(line);

        for sprite in 0..SPRITE_COUNT {
            let entry = OAM_START + sprite * 4;
            let y = mem[entry];
            if usize::from(y) >= SCREEN_HEIGHT + 16 {
                continue;
            }
            let top = i16::from(y) - 16;
            if line < top || line >= top + height {
                continue;
            }
            let x = mem[entry + 1].wrapping_sub(8);
            let mut tile = mem[entry + 2];
            let flags = mem[entry + 3];
            let behind_bg = check_bit_const::<7>(flags);
            let flip_y = check_bit_const::<6>(flags);
            let flip_x = check_bit_const::<5>(flags);
            let palette = mem[if check_bit_const::<4>(flags) { OBP1 } else { OBP0 }];

            if tall {
                let bottom_half = line >= top + 8;
                tile = (tile & 0xFE) | u8::from(bottom_half != flip_y);
            }
            let mut tile_row = (i16::from(y) - line - 1) % 8;
            if !flip_y {
                tile_row = 7 - tile_row;
            }
            let addr = 0x8000 + u16::from(tile) * 16 + tile_row as u16 * 2;
            let (lo, hi) = (mem[addr], mem[addr + 1]);

            for i in 0..8u8 {
                let bit = if flip_x { i } else { 7 - i };
                let color = color_at(lo, hi, bit);
                if color == 0 {
                    continue;
                }
                let column = usize::from(x.wrapping_add(i));
                if column >= SCREEN_WIDTH
                    || (behind_bg && self.bg_line[column] != 0)
                    || self.sprite_y[column] >= y
                {
                    continue;
                }
                self.screen[row + column] = shade(palette, color);
                self.sprite_y[column] = y;
            }
        }
    }
}

/// The color of the pixel at (`x`, `y`) of a 256x256 tile map.
fn tile_pixel(mem: &MemoryMap, map: u16, signed: bool, x: u8, y: u8) -> u8 {
    let index = mem[map + u16::from(y / 8) * 32 + u16::from(x / 8)];
    let tile = if signed {
        0x9000u16.wrapping_add_signed(i16::from(index as i8) * 16)
    } else {
        0x8000 + u16::from(index) * 16
    };
    let addr = tile + u16::from(y % 8) * 2;
    color_at(mem[addr], mem[addr + 1], 7 - x % 8)
}

fn color_at(lo: u8, hi: u8, bit: u8) -> u8 {
    (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1)
}

/// Maps a 2-bit color through one of the palette registers.
fn shade(palette: u8, color: u8) -> u8 {
    (palette >> (color * 2)) & 0x03
}
