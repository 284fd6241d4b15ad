use std::io::Read;
use std::io::Write;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::apu::CLOCK_SPEED;
use crate::cpu::Cpu;
use crate::error::Error;
use crate::error::Result;
use crate::input::Buttons;
use crate::input::JoypadInput;
use crate::instruction::InterruptOp;
use crate::mem::io::timers::Timers;
use crate::mem::MemoryMap;
use crate::mem::BOOT_ROM_SIZE;
use crate::ppu::Ppu;
use crate::replay::ReplayPlayer;
use crate::rom::Cartridge;
use crate::state;

/// The default frame rate the cycle budget of [`Gameboy::next_frame`] is derived from.
pub const FRAME_RATE: u32 = 60;

/// The number of cycles [`Gameboy::next_frame`] runs before handing control back.
pub const CYCLES_PER_FRAME: u32 = CLOCK_SPEED / FRAME_RATE;

/// The whole machine: CPU, bus, pixel unit and timers, plus the host-facing controls (replay,
/// single-stepping, the stop flag). There is no `run` method. The host calls
/// [`next_frame`](Self::next_frame) at whatever rate it likes, so pacing and IO stay outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gameboy {
    pub cpu: Cpu,
    pub mem: MemoryMap,
    pub ppu: Ppu,
    pub timers: Timers,
    /// Cycles run since the current frame budget started.
    pub(crate) cycles: u32,
    /// VBlanks seen since the last reset.
    pub(crate) frames: u32,
    step_mode: bool,
    step_requested: bool,
    stopped: bool,
    replay: ReplayPlayer,
}

impl Gameboy {
    /// Inserts the cartridge and powers on without a boot image.
    pub fn new(cart: Cartridge) -> Self {
        let mut digest = Self {
            cpu: Cpu::power_on(),
            mem: MemoryMap::new(cart),
            ppu: Ppu::new(),
            timers: Timers::new(),
            cycles: 0,
            frames: 0,
            step_mode: false,
            step_requested: false,
            stopped: false,
            replay: ReplayPlayer::new(),
        };
        digest.reset();
        digest
    }

    /// Powers on with the given 256 byte boot image mapped over the bottom of the cartridge.
    pub fn with_boot_rom(cart: Cartridge, boot: Vec<u8>) -> Result<Self> {
        if boot.len() != BOOT_ROM_SIZE {
            return Err(Error::invalid(format!(
                "boot image is {} bytes, expected {BOOT_ROM_SIZE}",
                boot.len()
            )));
        }
        let mut digest = Self::new(cart);
        digest.mem.set_boot_rom(boot);
        digest.reset();
        Ok(digest)
    }

    /// Puts the machine back into its power on state. Cartridge RAM is kept.
    pub fn reset(&mut self) {
        self.mem.reset();
        self.power_on();
    }

    /// Like [`reset`](Self::reset), but the bank controller and cartridge RAM are rebuilt too.
    pub fn hard_reset(&mut self) {
        self.mem.hard_reset();
        self.power_on();
    }

    fn power_on(&mut self) {
        // The boot image leaves the registers in their documented state itself
        self.cpu = if self.mem.booting() {
            Cpu::new()
        } else {
            Cpu::power_on()
        };
        self.ppu.reset(&mut self.mem);
        self.timers = Timers::new();
        self.cycles = 0;
        self.frames = 0;
    }

    /// Runs one instruction (or one halted tick), advances every other component by the same
    /// number of cycles, then services at most one interrupt. Returns the cycles consumed,
    /// including any interrupt dispatch.
    pub fn step(&mut self) -> Result<u32> {
        if self.mem.booting() && self.cpu.pc >= BOOT_ROM_SIZE as u16 {
            self.mem.finish_boot();
        }
        let mut cycles = self.cpu.step(&mut self.mem)?;
        self.advance(cycles);
        if self.cpu.ime {
            if let Some(op) = self.mem.pending_interrupt() {
                let dispatch = self.cpu.service_interrupt(op, &mut self.mem);
                self.advance(dispatch);
                cycles += dispatch;
            }
        }
        self.cycles += cycles;
        Ok(cycles)
    }

    fn advance(&mut self, cycles: u32) {
        if self.timers.tick(cycles, &mut self.mem) {
            self.mem.request_interrupt(InterruptOp::Timer);
        }
        if self.ppu.tick(cycles, &mut self.mem) {
            self.on_vblank();
        }
        self.mem.tick_apu(cycles);
    }

    fn on_vblank(&mut self) {
        self.frames = self.frames.wrapping_add(1);
        if self.mem.booting() {
            return;
        }
        if let Some(frame) = self.replay.next_frame() {
            if frame.reset {
                self.reset();
            }
            self.mem.set_buttons(frame.buttons);
        }
    }

    /// Runs until a frame's worth of cycles has elapsed. Overshoot carries into the next frame.
    ///
    /// In single-step mode, this runs at most one instruction, and only if one was requested.
    /// A stopped machine does nothing.
    pub fn next_frame(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        if self.step_mode {
            if std::mem::take(&mut self.step_requested) {
                self.step()?;
            }
            return Ok(());
        }
        while self.cycles < CYCLES_PER_FRAME {
            self.step()?;
        }
        self.cycles -= CYCLES_PER_FRAME;
        Ok(())
    }

    /// Snapshots the host's input source as the held buttons. A replay in progress overrides
    /// this at the next VBlank.
    pub fn set_buttons(&mut self, input: impl JoypadInput) {
        self.mem.set_buttons(input.pressed());
    }

    pub fn set_step_mode(&mut self, step_mode: bool) {
        self.step_mode = step_mode;
        self.step_requested = false;
    }

    pub fn is_step_mode(&self) -> bool {
        self.step_mode
    }

    /// Lets the next call to [`next_frame`](Self::next_frame) run a single instruction. Requests
    /// do not stack.
    pub fn request_step(&mut self) {
        self.step_requested = true;
    }

    pub fn stop(&mut self) {
        info!("Stopping after {} frames", self.frames);
        self.stopped = true;
        self.replay.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// The 160x144 frame as shade indices.
    pub fn screen(&self) -> &[u8] {
        self.ppu.screen()
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.mem.apu.mixer.sample_rate = sample_rate;
    }

    /// Fills `out` with interleaved stereo samples. Silent while single-stepping.
    pub fn fill_audio(&mut self, out: &mut [i16]) {
        self.mem.fill_audio(out, self.step_mode);
    }

    /// Loads a VBM movie and hard resets so playback starts from power on. A rejected movie
    /// leaves the machine untouched.
    pub fn start_replay(&mut self, mut input: impl Read) -> Result<()> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        self.replay.load(data)?;
        self.hard_reset();
        Ok(())
    }

    pub fn replay(&self) -> &ReplayPlayer {
        &self.replay
    }

    /// Writes the binary save state. See [`state::save`].
    pub fn save_state(&self, out: impl Write) -> Result<()> {
        state::save(self, out)
    }

    /// Hard resets and restores a binary save state. See [`state::load`].
    pub fn load_state(&mut self, input: impl Read) -> Result<()> {
        state::load(self, input)
    }
}
