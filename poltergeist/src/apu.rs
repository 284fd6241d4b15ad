//! The four voice sound generator. Channel state is advanced by the same cycle deltas as the rest
//! of the machine; samples are only produced when the host pulls them through [`Apu::fill`].

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::cpu::check_bit_const;
use crate::mem::io::*;
use crate::mem::Ram;

/// The clock rate of the machine, in Hz.
pub const CLOCK_SPEED: u32 = 4_194_304;

/// Peak amplitude contributed by a single channel at full volume and full master level.
pub const AMPLITUDE: f32 = 3500.0;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Length counters tick at 256 Hz.
const LENGTH_STEP: i32 = (CLOCK_SPEED / 256) as i32;

/// The frequency sweep unit runs at 128 Hz.
const SWEEP_STEP: u32 = CLOCK_SPEED / 128;

/// Volume envelopes run at 64 Hz.
const ENVELOPE_STEP: u32 = CLOCK_SPEED / 64;

const DUTY_CYCLES: [f32; 4] = [0.125, 0.25, 0.5, 0.75];

/// The state shared by all four voices. Not every field is meaningful for every voice: the wave
/// channel has no envelope, for example.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// 0..=15 for the pulse and noise voices. The wave voice stores its output shift here as
    /// quarter steps (4 is full volume, 0 is mute).
    pub volume: u8,
    /// The number of envelope steps between volume changes. Zero disables the envelope.
    pub envelope_period: u8,
    pub envelope_increase: bool,
    pub envelope_timer: u32,
    pub length: u8,
    /// Cycles left until the length counter silences the channel.
    pub length_timer: i32,
    pub length_enabled: bool,
    /// The raw 11-bit frequency value.
    pub frequency: u16,
    pub restart: bool,
}

impl Channel {
    fn load_length(&mut self, length: u8, max: i32) {
        self.length = length;
        self.length_timer = (max - length as i32) * LENGTH_STEP;
    }

    fn load_envelope(&mut self, byte: u8) {
        self.volume = byte >> 4;
        self.envelope_period = byte & 0x07;
        self.envelope_increase = check_bit_const::<3>(byte);
    }

    fn set_frequency_low(&mut self, byte: u8) {
        self.frequency = (self.frequency & 0x0700) | byte as u16;
    }

    /// Handles the common parts of an NRx4 write.
    fn control(&mut self, byte: u8) {
        self.restart = check_bit_const::<7>(byte);
        self.length_enabled = check_bit_const::<6>(byte);
        self.frequency = (self.frequency & 0x00FF) | (((byte & 0x07) as u16) << 8);
    }
}

#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweep {
    /// Sweep steps between frequency updates. Zero disables the unit.
    pub period: u8,
    pub decrease: bool,
    pub shift: u8,
    pub timer: u32,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Noise {
    /// The 15-bit linear feedback shift register.
    pub lfsr: u16,
    /// Also feed back into bit 6, which shortens the sequence to 127 steps.
    pub narrow: bool,
    pub shift: u8,
    pub divisor: u8,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            lfsr: 0x7FFF,
            narrow: false,
            shift: 0,
            divisor: 0,
        }
    }
}

impl Noise {
    /// The rate (in Hz) that the shift register is clocked at.
    fn frequency(&self) -> f32 {
        let ratio = match self.divisor {
            0 => 0.5,
            n => n as f32,
        };
        524_288.0 / ratio / (1u32 << (self.shift as u32 + 1)) as f32
    }

    fn step(&mut self) {
        let bit = (self.lfsr ^ (self.lfsr >> 1)) & 0x1;
        self.lfsr = (self.lfsr >> 1) | (bit << 14);
        if self.narrow {
            self.lfsr = (self.lfsr & !(1 << 6)) | (bit << 6);
        }
    }

    fn output(&self) -> f32 {
        if self.lfsr & 0x1 == 0 {
            1.0
        } else {
            -1.0
        }
    }
}

/// The sample-rate dependent state used only while producing output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mixer {
    pub sample_rate: u32,
    /// Position within one waveform period, in [0, 1), for each voice.
    phases: [f32; 3],
    /// Fractional shift register clocks carried between samples.
    noise_clock: f32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            phases: [0.0; 3],
            noise_clock: 0.0,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apu {
    pub power: bool,
    pub channels: [Channel; 4],
    /// Duty cycle index for the two pulse voices.
    pub duty: [u8; 2],
    pub sweep: Sweep,
    pub noise: Noise,
    /// NR30 bit 7.
    pub wave_enabled: bool,
    /// Master volume for the output fed by the low nibble of NR51 (0..=7).
    pub left_level: u8,
    /// Master volume for the output fed by the high nibble of NR51 (0..=7).
    pub right_level: u8,
    pub mixer: Mixer,
}

impl Apu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the register-derived parts of the unit (duty, sweep, noise shape, master levels)
    /// from the values currently in memory. Used after reset and after loading a state.
    pub fn restore_from_registers(&mut self, ram: &Ram) {
        self.power = check_bit_const::<7>(ram[NR52]);
        self.duty = [ram[NR11] >> 6, ram[NR21] >> 6];
        self.load_sweep(ram[NR10]);
        self.load_noise(ram[NR43]);
        self.wave_enabled = check_bit_const::<7>(ram[NR30]);
        self.load_levels(ram[NR50]);
    }

    fn load_sweep(&mut self, byte: u8) {
        self.sweep.period = (byte >> 4) & 0x07;
        self.sweep.decrease = check_bit_const::<3>(byte);
        self.sweep.shift = byte & 0x07;
    }

    fn load_noise(&mut self, byte: u8) {
        self.noise.shift = byte >> 4;
        self.noise.narrow = check_bit_const::<3>(byte);
        self.noise.divisor = byte & 0x07;
    }

    fn load_levels(&mut self, byte: u8) {
        self.left_level = byte & 0x07;
        self.right_level = (byte >> 4) & 0x07;
    }

    /// Handles a CPU write into 0xFF10..=0xFF26. The memory map delegates these here so that the
    /// register and the channel state always change together.
    pub fn write_register(&mut self, addr: u16, byte: u8, ram: &mut Ram) {
        if addr == NR52 {
            self.write_power(byte, ram);
            return;
        }
        if !self.power {
            return;
        }
        match addr {
            NR10 => self.load_sweep(byte),
            NR11 => {
                self.channels[0].load_length(byte & 0x3F, 64);
                self.duty[0] = byte >> 6;
            }
            NR12 => self.channels[0].load_envelope(byte),
            NR13 => self.channels[0].set_frequency_low(byte),
            NR14 => {
                let ch = &mut self.channels[0];
                ch.control(byte);
                ch.load_length(ram[NR11] & 0x3F, 64);
                if check_bit_const::<7>(byte) {
                    ram[NR52] |= 0x01;
                    self.channels[0].volume = ram[NR12] >> 4;
                    self.load_sweep(ram[NR10]);
                    self.sweep.timer = 0;
                    if self.sweep.period != 0 && self.sweep.shift != 0 {
                        self.apply_sweep(ram);
                    }
                }
            }
            NR21 => {
                self.channels[1].load_length(byte & 0x3F, 64);
                self.duty[1] = byte >> 6;
            }
            NR22 => self.channels[1].load_envelope(byte),
            NR23 => self.channels[1].set_frequency_low(byte),
            NR24 => {
                let ch = &mut self.channels[1];
                ch.control(byte);
                ch.load_length(ram[NR21] & 0x3F, 64);
                if check_bit_const::<7>(byte) {
                    ram[NR52] |= 0x02;
                    ch.volume = ram[NR22] >> 4;
                }
            }
            NR30 => self.wave_enabled = check_bit_const::<7>(byte),
            NR31 => self.channels[2].load_length(byte, 256),
            NR32 => self.channels[2].volume = wave_volume(byte),
            NR33 => self.channels[2].set_frequency_low(byte),
            NR34 => {
                let ch = &mut self.channels[2];
                ch.control(byte);
                if check_bit_const::<7>(byte) {
                    ram[NR52] |= 0x04;
                    ch.load_length(ram[NR31], 256);
                    ch.volume = wave_volume(ram[NR32]);
                }
            }
            NR41 => self.channels[3].load_length(byte & 0x3F, 64),
            NR42 => self.channels[3].load_envelope(byte),
            NR43 => self.load_noise(byte),
            NR44 => {
                let ch = &mut self.channels[3];
                ch.restart = check_bit_const::<7>(byte);
                ch.length_enabled = check_bit_const::<6>(byte);
                if check_bit_const::<7>(byte) {
                    ram[NR52] |= 0x08;
                    ch.load_length(ram[NR41] & 0x3F, 64);
                    ch.volume = ram[NR42] >> 4;
                    self.noise.lfsr = 0x7FFF;
                }
            }
            NR50 => self.load_levels(byte),
            _ => {}
        }
        ram[addr] = byte;
    }

    fn write_power(&mut self, byte: u8, ram: &mut Ram) {
        let power = check_bit_const::<7>(byte);
        if self.power && !power {
            debug!("Sound powered off");
            for addr in NR10..NR51 {
                ram[addr] = 0;
            }
            self.channels = Default::default();
            self.sweep = Sweep::default();
            self.duty = [0; 2];
            self.wave_enabled = false;
            self.left_level = 0;
            self.right_level = 0;
            ram[NR52] &= 0xF0;
        }
        self.power = power;
        ram[NR52] = (ram[NR52] & 0x7F) | (byte & 0x80);
    }

    /// Advances the sweep, length, and envelope units.
    pub fn tick(&mut self, cycles: u32, ram: &mut Ram) {
        if !self.power {
            return;
        }
        // A zero period parks the sweep, so its timer must not run either
        if self.sweep.period != 0 {
            self.sweep.timer += cycles;
            if self.sweep.timer >= self.sweep.period as u32 * SWEEP_STEP {
                self.sweep.timer = 0;
                self.apply_sweep(ram);
            }
        }
        for ch in 0..4 {
            self.tick_length(ch, cycles, ram);
        }
        for ch in [0, 1, 3] {
            self.tick_envelope(ch, cycles);
        }
    }

    /// Recomputes channel 0's frequency as `f ± f / 2^shift`, turning the channel off when the
    /// result does not fit in 11 bits.
    fn apply_sweep(&mut self, ram: &mut Ram) {
        let ch = &mut self.channels[0];
        let delta = ch.frequency >> self.sweep.shift;
        if self.sweep.decrease {
            ch.frequency = ch.frequency.saturating_sub(delta);
        } else {
            ch.frequency += delta;
            if ch.frequency > 0x7FF {
                ch.frequency = 0;
                ram[NR52] &= !0x01;
            }
        }
        let [hi, lo] = ch.frequency.to_be_bytes();
        ram[NR13] = lo;
        ram[NR14] = (ram[NR14] & !0x07) | (hi & 0x07);
    }

    fn tick_length(&mut self, index: usize, cycles: u32, ram: &mut Ram) {
        let ch = &mut self.channels[index];
        if !ch.length_enabled {
            return;
        }
        ch.length_timer -= cycles as i32;
        if ch.length_timer <= 0 {
            ch.volume = 0;
            ch.length = 0;
            ch.length_timer = 0;
            ch.length_enabled = false;
            silence(index, ram);
        }
    }

    fn tick_envelope(&mut self, index: usize, cycles: u32) {
        let ch = &mut self.channels[index];
        if ch.envelope_period == 0 {
            return;
        }
        ch.envelope_timer += cycles;
        if ch.envelope_timer >= ch.envelope_period as u32 * ENVELOPE_STEP {
            ch.envelope_timer = 0;
            if ch.envelope_increase {
                ch.volume = (ch.volume + 1).min(15);
            } else {
                ch.volume = ch.volume.saturating_sub(1);
            }
        }
    }

    /// Fills `out` with interleaved stereo samples. When the unit is powered down or `muted` is
    /// set, the buffer is zeroed.
    pub fn fill(&mut self, ram: &Ram, out: &mut [i16], muted: bool) {
        if !self.power || muted {
            out.fill(0);
            return;
        }
        let rate = self.mixer.sample_rate.max(1) as f32;
        let status = ram[NR52];
        let routing = ram[NR51];
        for frame in out.chunks_mut(2) {
            let voices = [
                self.pulse(0, rate),
                self.pulse(1, rate),
                self.wave(ram, rate),
                self.noise(rate),
            ];
            let (mut left, mut right) = (0.0, 0.0);
            for (i, voice) in voices.into_iter().enumerate() {
                if status & (1 << i) == 0 {
                    continue;
                }
                if routing & (1 << i) != 0 {
                    left += voice;
                }
                if routing & (0x10 << i) != 0 {
                    right += voice;
                }
            }
            let left = AMPLITUDE * left * self.left_level as f32 / 7.0;
            let right = AMPLITUDE * right * self.right_level as f32 / 7.0;
            frame[0] = left.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            if let Some(r) = frame.get_mut(1) {
                *r = right.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            }
        }
    }

    fn advance_phase(&mut self, voice: usize, hz: f32, rate: f32) -> f32 {
        let phase = &mut self.mixer.phases[voice];
        let current = *phase;
        *phase = (*phase + hz / rate).fract();
        current
    }

    fn pulse(&mut self, index: usize, rate: f32) -> f32 {
        let ch = &self.channels[index];
        let hz = 131_072.0 / (2048 - ch.frequency.min(2047)) as f32;
        let volume = ch.volume as f32 / 15.0;
        let duty = DUTY_CYCLES[self.duty[index] as usize & 0x3];
        let phase = self.advance_phase(index, hz, rate);
        let level = if phase < duty { 1.0 } else { -1.0 };
        level * volume
    }

    fn wave(&mut self, ram: &Ram, rate: f32) -> f32 {
        if !self.wave_enabled {
            return 0.0;
        }
        let ch = &self.channels[2];
        let hz = 65_536.0 / (2048 - ch.frequency.min(2047)) as f32;
        let volume = ch.volume as f32 * 0.25;
        let phase = self.advance_phase(2, hz, rate);
        let index = ((phase * 32.0) as u16).min(31);
        let byte = ram[WAVE_RAM + index / 2];
        let nibble = if index % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        (nibble as f32 - 8.0) / 8.0 * volume
    }

    fn noise(&mut self, rate: f32) -> f32 {
        let volume = self.channels[3].volume as f32 / 15.0;
        self.mixer.noise_clock += self.noise.frequency() / rate;
        while self.mixer.noise_clock >= 1.0 {
            self.mixer.noise_clock -= 1.0;
            self.noise.step();
        }
        self.noise.output() * volume
    }
}

/// The wave voice's output level code in NR32 bits 5-6, as quarter steps.
fn wave_volume(byte: u8) -> u8 {
    match (byte >> 5) & 0x3 {
        0 => 0,
        1 => 4,
        2 => 2,
        _ => 1,
    }
}

/// Turns a voice off once its length counter runs out.
fn silence(index: usize, ram: &mut Ram) {
    ram[NR52] &= !(1 << index);
    match index {
        0 => {
            ram[NR11] &= 0xC0;
            ram[NR12] &= 0x0F;
        }
        1 => {
            ram[NR21] &= 0xC0;
            ram[NR22] &= 0x0F;
        }
        2 => {
            ram[NR31] = 0;
            ram[NR32] = 0;
        }
        _ => {
            ram[NR41] &= 0xC0;
            ram[NR42] &= 0x0F;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powered() -> (Apu, Ram) {
        let mut ram = Ram::new();
        let mut apu = Apu::new();
        apu.write_register(NR52, 0x80, &mut ram);
        (apu, ram)
    }

    #[test]
    fn pulse_trigger_loads_envelope_volume() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR12, 0xA3, &mut ram);
        apu.channels[0].volume = 0;
        apu.write_register(NR14, 0x80, &mut ram);
        assert_eq!(apu.channels[0].volume, 0xA);
        assert_eq!(ram[NR52] & 0x01, 0x01);

        apu.write_register(NR22, 0x50, &mut ram);
        apu.write_register(NR24, 0x87, &mut ram);
        assert_eq!(apu.channels[1].volume, 0x5);
        assert_eq!(apu.channels[1].frequency, 0x700);
        assert_eq!(ram[NR52] & 0x02, 0x02);
    }

    #[test]
    fn writes_ignored_while_powered_off() {
        let mut ram = Ram::new();
        let mut apu = Apu::new();
        apu.write_register(NR12, 0xF0, &mut ram);
        assert_eq!(ram[NR12], 0);
        assert_eq!(apu.channels[0].volume, 0);
        apu.write_register(NR52, 0x80, &mut ram);
        apu.write_register(NR12, 0xF0, &mut ram);
        assert_eq!(ram[NR12], 0xF0);
    }

    #[test]
    fn power_off_clears_registers_but_not_routing() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR12, 0xF0, &mut ram);
        apu.write_register(NR50, 0x77, &mut ram);
        apu.write_register(NR51, 0xFF, &mut ram);
        apu.write_register(NR14, 0x80, &mut ram);
        apu.write_register(NR52, 0x00, &mut ram);
        assert_eq!(ram[NR12], 0);
        assert_eq!(ram[NR50], 0);
        assert_eq!(ram[NR51], 0xFF);
        assert_eq!(ram[NR52], 0);
        assert!(!apu.power);
    }

    #[test]
    fn length_counter_silences_channel() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR11, 0x3F, &mut ram);
        apu.write_register(NR12, 0xF0, &mut ram);
        apu.write_register(NR14, 0xC0, &mut ram);
        assert_eq!(apu.channels[0].length_timer, LENGTH_STEP);
        apu.tick(LENGTH_STEP as u32 - 4, &mut ram);
        assert_eq!(ram[NR52] & 0x01, 0x01);
        apu.tick(4, &mut ram);
        assert_eq!(ram[NR52] & 0x01, 0);
        assert_eq!(apu.channels[0].volume, 0);
        assert_eq!(ram[NR12], 0x00);
    }

    #[test]
    fn envelope_steps_and_clamps() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR22, 0xE9, &mut ram);
        apu.write_register(NR24, 0x80, &mut ram);
        assert_eq!(apu.channels[1].volume, 14);
        apu.tick(ENVELOPE_STEP, &mut ram);
        assert_eq!(apu.channels[1].volume, 15);
        apu.tick(ENVELOPE_STEP, &mut ram);
        assert_eq!(apu.channels[1].volume, 15);

        apu.write_register(NR42, 0x11, &mut ram);
        apu.write_register(NR44, 0x80, &mut ram);
        apu.tick(ENVELOPE_STEP, &mut ram);
        assert_eq!(apu.channels[3].volume, 0);
        apu.tick(ENVELOPE_STEP, &mut ram);
        assert_eq!(apu.channels[3].volume, 0);
    }

    #[test]
    fn sweep_overflow_disables_channel() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR10, 0x11, &mut ram);
        apu.write_register(NR12, 0xF0, &mut ram);
        apu.write_register(NR13, 0xFF, &mut ram);
        apu.write_register(NR14, 0x87, &mut ram);
        // 0x7FF + 0x3FF does not fit in 11 bits
        assert_eq!(ram[NR52] & 0x01, 0);
        assert_eq!(apu.channels[0].frequency, 0);
    }

    #[test]
    fn sweep_updates_frequency_registers() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR10, 0x12, &mut ram);
        apu.write_register(NR13, 0x00, &mut ram);
        apu.write_register(NR14, 0x81, &mut ram);
        // Triggering applies the sweep once: 0x100 + 0x40
        assert_eq!(apu.channels[0].frequency, 0x140);
        apu.tick(SWEEP_STEP, &mut ram);
        assert_eq!(apu.channels[0].frequency, 0x190);
        assert_eq!(ram[NR13], 0x90);
        assert_eq!(ram[NR14] & 0x07, 0x01);
    }

    #[test]
    fn noise_trigger_reseeds_lfsr() {
        let (mut apu, mut ram) = powered();
        apu.noise.lfsr = 0x1234;
        apu.write_register(NR42, 0xF0, &mut ram);
        apu.write_register(NR44, 0x80, &mut ram);
        assert_eq!(apu.noise.lfsr, 0x7FFF);
        assert_eq!(ram[NR52] & 0x08, 0x08);
        apu.noise.step();
        assert_eq!(apu.noise.lfsr, 0x3FFF);
    }

    #[test]
    fn narrow_lfsr_repeats_every_127_steps() {
        let mut noise = Noise {
            narrow: true,
            ..Noise::default()
        };
        noise.step();
        let start = noise.lfsr & 0x7F;
        let period = (1..=200)
            .find(|_| {
                noise.step();
                noise.lfsr & 0x7F == start
            })
            .unwrap();
        assert_eq!(period, 127);
    }

    #[test]
    fn idle_sweep_survives_long_runs() {
        let (mut apu, mut ram) = powered();
        assert_eq!(apu.sweep.period, 0);
        // Well past what a u32 cycle counter can hold
        for _ in 0..1100 {
            apu.tick(CLOCK_SPEED, &mut ram);
        }
        assert_eq!(apu.sweep.timer, 0);
        assert!(apu.power);
    }

    #[test]
    fn wave_plays_back_wave_ram() {
        let (mut apu, mut ram) = powered();
        for i in 0..16 {
            ram[WAVE_RAM + i] = 0xFF;
        }
        apu.write_register(NR50, 0x77, &mut ram);
        apu.write_register(NR51, 0x44, &mut ram);
        apu.write_register(NR30, 0x80, &mut ram);
        apu.write_register(NR32, 0x20, &mut ram);
        apu.write_register(NR34, 0x80, &mut ram);
        assert_eq!(ram[NR52] & 0x04, 0x04);

        // Nibble 15 at full level sits 7/8 of the way up
        let mut out = [0i16; 32];
        apu.fill(&ram, &mut out, false);
        assert!(out.iter().all(|s| *s == 3062), "{out:?}");

        apu.write_register(NR32, 0x00, &mut ram);
        apu.fill(&ram, &mut out, false);
        assert!(out.iter().all(|s| *s == 0));

        apu.write_register(NR32, 0x20, &mut ram);
        apu.write_register(NR30, 0x00, &mut ram);
        apu.fill(&ram, &mut out, false);
        assert!(out.iter().all(|s| *s == 0));
    }

    #[test]
    fn noise_output_follows_the_lfsr() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR50, 0x77, &mut ram);
        apu.write_register(NR51, 0x88, &mut ram);
        apu.write_register(NR42, 0xF0, &mut ram);
        apu.write_register(NR43, 0x00, &mut ram);
        apu.write_register(NR44, 0x80, &mut ram);

        let mut out = [0i16; 256];
        apu.fill(&ram, &mut out, false);
        assert!(out.iter().all(|s| s.unsigned_abs() == AMPLITUDE as u16));
        assert!(out.iter().any(|s| *s > 0));
        assert!(out.iter().any(|s| *s < 0));
        assert_ne!(apu.noise.lfsr, 0x7FFF);
    }

    #[test]
    fn mixing_respects_routing_and_power() {
        let (mut apu, mut ram) = powered();
        apu.write_register(NR50, 0x77, &mut ram);
        apu.write_register(NR51, 0x01, &mut ram);
        apu.write_register(NR12, 0xF0, &mut ram);
        apu.write_register(NR14, 0x80, &mut ram);
        let mut out = [0i16; 64];
        apu.fill(&ram, &mut out, false);
        assert!(out.chunks(2).any(|f| f[0] != 0));
        assert!(out.chunks(2).all(|f| f[1] == 0));
        assert!(out.iter().all(|s| s.unsigned_abs() <= AMPLITUDE as u16));

        apu.fill(&ram, &mut out, true);
        assert!(out.iter().all(|s| *s == 0));
        apu.write_register(NR52, 0x00, &mut ram);
        out.fill(1);
        apu.fill(&ram, &mut out, false);
        assert!(out.iter().all(|s| *s == 0));
    }
}
