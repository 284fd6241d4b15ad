//! Wisp is a headless runner for the poltergeist core. It loads a cartridge (plus an optional boot
//! image, save state, and replay), runs it with wall-clock pacing, and writes out whatever the
//! user asked to keep once it stops.

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use poltergeist::Cartridge;
use poltergeist::Gameboy;
use poltergeist::SCREEN_HEIGHT;
use poltergeist::SCREEN_WIDTH;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use config::DEFAULT_CONFIG_PATH;
use pacing::Pacer;

mod config;
mod pacing;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The path to the ROM to run.
    rom: PathBuf,
    /// The settings file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// A 256 byte boot image. Overrides `boot_rom` from the settings file.
    #[arg(long)]
    boot: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
    /// Run as fast as possible.
    #[arg(long)]
    uncapped: bool,
    /// A VBM movie to play back.
    #[arg(long)]
    replay: Option<PathBuf>,
    #[arg(long)]
    load_state: Option<PathBuf>,
    /// Where to write a save state on exit.
    #[arg(long)]
    save_state: Option<PathBuf>,
    /// Where to write a PNG of the last frame on exit.
    #[arg(long)]
    screenshot: Option<PathBuf>,
    /// Where to write the audio, as raw interleaved little-endian i16 stereo.
    #[arg(long)]
    audio_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::read(&args.config)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut gb = construct(&args, &config)?;
    let mut audio = args
        .audio_out
        .as_deref()
        .map(|path| create(path).map(BufWriter::new))
        .transpose()?;
    let samples_per_frame = (f64::from(config.sample_rate) / config.frame_rate).round() as usize;
    let mut samples = vec![0i16; 2 * samples_per_frame];
    let mut pacer = Pacer::new(config.frame_rate);

    let mut ran = 0u64;
    while !gb.is_stopped() {
        gb.next_frame()
            .with_context(|| format!("Emulation failed on frame {ran}"))?;
        ran += 1;
        if let Some(out) = audio.as_mut() {
            gb.fill_audio(&mut samples);
            let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            out.write_all(&bytes).context("Could not write audio")?;
        }
        if args.frames.is_some_and(|limit| ran >= limit) {
            gb.stop();
        } else if !args.uncapped {
            pacer.wait();
        }
    }
    info!("Ran {ran} frames");

    if let Some(mut out) = audio {
        out.flush().context("Could not write audio")?;
    }
    if let Some(path) = &args.screenshot {
        screenshot(&gb, &config, path)?;
    }
    if let Some(path) = &args.save_state {
        let out = BufWriter::new(create(path)?);
        gb.save_state(out)
            .with_context(|| format!("Could not save state to {}", path.display()))?;
    }
    Ok(())
}

/// Builds the machine and applies the replay and save state, in that order. Starting a replay
/// resets the machine, so a state loaded afterwards is where the movie picks up.
fn construct(args: &Args, config: &Config) -> anyhow::Result<Gameboy> {
    let cart = Cartridge::new(read(&args.rom)?)
        .with_context(|| format!("Could not load cartridge {}", args.rom.display()))?;
    let mut gb = match args.boot.as_ref().or(config.boot_rom.as_ref()) {
        Some(path) => Gameboy::with_boot_rom(cart, read(path)?)
            .with_context(|| format!("Could not use boot image {}", path.display()))?,
        None => Gameboy::new(cart),
    };
    gb.set_sample_rate(config.sample_rate);
    if let Some(path) = &args.replay {
        gb.start_replay(BufReader::new(open(path)?))
            .with_context(|| format!("Could not start replay {}", path.display()))?;
    }
    if let Some(path) = &args.load_state {
        gb.load_state(BufReader::new(open(path)?))
            .with_context(|| format!("Could not load state {}", path.display()))?;
    }
    Ok(gb)
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| poltergeist::Error::from_open(e, path))
        .with_context(|| format!("Could not read {}", path.display()))
}

fn open(path: &Path) -> anyhow::Result<File> {
    File::open(path)
        .map_err(|e| poltergeist::Error::from_open(e, path))
        .with_context(|| format!("Could not open {}", path.display()))
}

fn create(path: &Path) -> anyhow::Result<File> {
    File::create(path).with_context(|| format!("Could not create {}", path.display()))
}

fn screenshot(gb: &Gameboy, config: &Config, path: &Path) -> anyhow::Result<()> {
    let mut encoder = png::Encoder::new(
        BufWriter::new(create(path)?),
        SCREEN_WIDTH as u32,
        SCREEN_HEIGHT as u32,
    );
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer
        .write_image_data(&config.colorize(gb.screen()))
        .with_context(|| format!("Could not write screenshot {}", path.display()))?;
    info!("Wrote screenshot to {}", path.display());
    Ok(())
}
