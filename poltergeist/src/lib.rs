//! Poltergeist is the core of a cycle-accurate emulator for the original monochrome handheld.
//! Contained here is all of the logic needed to run a game cartridge: the CPU, the memory bus and
//! its bank controller, the pixel unit, the sound unit, the timers and the interrupt plumbing.
//!
//! The crate is free of any windowing, audio device, or timing code. A host constructs a
//! [`Gameboy`], feeds it input, and ticks it forward one frame (or one instruction) at a time,
//! pulling video from [`Gameboy::screen`] and audio from [`Gameboy::fill_audio`].
//!
//! # Notes
//! The CPU is little endian. The save state format is not; see [`state`].

pub mod apu;
pub mod cpu;
pub mod error;
pub mod gameboy;
pub mod input;
pub mod instruction;
pub mod lookup;
pub mod mem;
pub mod ppu;
pub mod replay;
pub mod rom;
pub mod state;

pub use error::Error;
pub use error::Result;
pub use gameboy::Gameboy;
pub use gameboy::CYCLES_PER_FRAME;
pub use input::Buttons;
pub use ppu::FRAME_CYCLES;
pub use ppu::SCREEN_HEIGHT;
pub use ppu::SCREEN_WIDTH;
pub use replay::ReplayPlayer;
pub use rom::Cartridge;
