//! The fixed binary save state. Every multi-byte field is big endian, in this order:
//!
//! | field                                                   | size      |
//! |---------------------------------------------------------|-----------|
//! | active ROM bank                                         | 1         |
//! | frame cycles, divider cycles, timer cycles, frame count | 4 x 4     |
//! | channel records                                         | 4 x 16    |
//! | PC, SP                                                  | 2 x 2     |
//! | A F B C D E H L                                         | 8         |
//! | memory image                                            | 65536     |
//!
//! The rest of the machine (PPU mode, sound generators, sweep and noise settings) is rebuilt
//! from the restored registers.

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;

use tracing::info;

use crate::apu::Channel;
use crate::error::Error;
use crate::error::Result;
use crate::gameboy::Gameboy;
use crate::mem::Ram;
use crate::mem::BOOT_ROM_SIZE;

const CHANNEL_RECORD_LEN: usize = 16;

/// The exact length of a save state.
pub const STATE_LEN: usize = 1 + 4 * 4 + 4 * CHANNEL_RECORD_LEN + 2 * 2 + 8 + Ram::SIZE;

/// Writes the state of `gb` to `out`.
pub fn save(gb: &Gameboy, mut out: impl Write) -> Result<()> {
    let mut buf = Vec::with_capacity(STATE_LEN);
    buf.push(gb.mem.mbc().rom_bank() as u8);
    for counter in [
        gb.cycles,
        gb.timers.divider_cycles,
        gb.timers.timer_cycles,
        gb.frames,
    ] {
        buf.extend(counter.to_be_bytes());
    }
    for chan in &gb.mem.apu.channels {
        write_channel(chan, &mut buf);
    }
    buf.extend(gb.cpu.pc.to_be_bytes());
    buf.extend(gb.cpu.sp.to_be_bytes());
    let cpu = &gb.cpu;
    buf.extend([
        cpu.a,
        cpu.f.as_byte(),
        cpu.b,
        cpu.c,
        cpu.d,
        cpu.e,
        cpu.h,
        cpu.l,
    ]);
    buf.extend_from_slice(gb.mem.ram().as_slice());
    out.write_all(&buf)?;
    out.flush()?;
    info!("Saved state at PC 0x{:0>4X}", gb.cpu.pc);
    Ok(())
}

fn write_channel(chan: &Channel, buf: &mut Vec<u8>) {
    buf.extend([chan.volume, chan.envelope_period, chan.length]);
    buf.extend(chan.length_timer.to_be_bytes());
    buf.extend(chan.frequency.to_be_bytes());
    buf.extend([
        chan.restart as u8,
        chan.length_enabled as u8,
        chan.envelope_increase as u8,
    ]);
    buf.extend(chan.envelope_timer.to_be_bytes());
}

/// Hard resets `gb` and restores the state read from `input`. The whole state is read before
/// anything is touched, so a short or failing stream leaves `gb` as it was.
pub fn load(gb: &mut Gameboy, mut input: impl Read) -> Result<()> {
    let mut buf = vec![0; STATE_LEN];
    input.read_exact(&mut buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => Error::invalid(format!(
            "save state is truncated, expected {STATE_LEN} bytes"
        )),
        _ => Error::StreamIo(err),
    })?;

    gb.hard_reset();
    let mut fields = Fields(&buf);
    let bank = fields.byte();
    gb.cycles = fields.u32();
    gb.timers.divider_cycles = fields.u32();
    gb.timers.timer_cycles = fields.u32();
    gb.frames = fields.u32();
    for chan in gb.mem.apu.channels.iter_mut() {
        read_channel(chan, &mut fields);
    }
    gb.cpu.pc = fields.u16();
    gb.cpu.sp = fields.u16();
    gb.cpu.a = fields.byte();
    gb.cpu.f.set_from_byte(fields.byte());
    gb.cpu.b = fields.byte();
    gb.cpu.c = fields.byte();
    gb.cpu.d = fields.byte();
    gb.cpu.e = fields.byte();
    gb.cpu.h = fields.byte();
    gb.cpu.l = fields.byte();
    gb.mem.ram_mut().as_mut_slice().copy_from_slice(fields.0);

    gb.mem.mbc_mut().set_rom_bank(bank as usize);
    gb.mem.restore_apu();
    gb.ppu.restore_from_registers(&gb.mem);
    if gb.mem.booting() && gb.cpu.pc >= BOOT_ROM_SIZE as u16 {
        gb.mem.finish_boot();
    }
    info!("Loaded state at PC 0x{:0>4X}", gb.cpu.pc);
    Ok(())
}

fn read_channel(chan: &mut Channel, fields: &mut Fields<'_>) {
    chan.volume = fields.byte();
    chan.envelope_period = fields.byte();
    chan.length = fields.byte();
    chan.length_timer = fields.i32();
    chan.frequency = fields.u16();
    chan.restart = fields.byte() != 0;
    chan.length_enabled = fields.byte() != 0;
    chan.envelope_increase = fields.byte() != 0;
    chan.envelope_timer = fields.u32();
}

/// Big endian reads over a buffer already known to be [`STATE_LEN`] long.
struct Fields<'a>(&'a [u8]);

impl Fields<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let (head, rest) = self.0.split_at(N);
        self.0 = rest;
        let mut digest = [0; N];
        digest.copy_from_slice(head);
        digest
    }

    fn byte(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take())
    }
}
