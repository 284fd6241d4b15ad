//! The runner's settings file. Every key is optional; anything left out takes its default, and a
//! missing file is the same as an empty one.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;

/// Where the settings are looked for when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "wisp.toml";

/// The usual green tinted shades, lightest first.
pub const DMG_PALETTE: [u32; 4] = [0x9BBC0F, 0x8BAC0F, 0x306230, 0x0F380F];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Used when `RUST_LOG` is not set.
    pub log_level: String,
    /// The rate frames are presented at. The hardware runs a little under 60.
    pub frame_rate: f64,
    pub sample_rate: u32,
    pub boot_rom: Option<PathBuf>,
    /// `0xRRGGBB` for each shade, lightest first.
    pub palette: [u32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            frame_rate: 59.73,
            sample_rate: poltergeist::apu::DEFAULT_SAMPLE_RATE,
            boot_rom: None,
            palette: DMG_PALETTE,
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .with_context(|| format!("Could not parse config at {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("Could not read config at {}", path.display()))
            }
        }
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        anyhow::ensure!(
            config.frame_rate.is_finite() && config.frame_rate > 0.0,
            "frame_rate must be positive, got {}",
            config.frame_rate
        );
        anyhow::ensure!(config.sample_rate > 0, "sample_rate must be positive");
        Ok(config)
    }

    /// Maps a screen of shade indices to packed RGB bytes.
    pub fn colorize(&self, screen: &[u8]) -> Vec<u8> {
        screen
            .iter()
            .flat_map(|shade| {
                let [_, r, g, b] = self.palette[usize::from(*shade & 0b11)].to_be_bytes();
                [r, g, b]
            })
            .collect()
    }
}
