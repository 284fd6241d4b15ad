//! Playback of VBM movie files. A movie is a header followed by one two-byte record per frame;
//! the [`Gameboy`](crate::Gameboy) pulls a record every time the PPU enters VBlank.

use heapless::String as InlineString;
use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;
use tracing::info;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::input::Buttons;

/// "VBM\x1A", little endian.
pub const VBM_MAGIC: u32 = 0x1A4D_4256;

/// The special byte bit that resets the machine before the frame is played.
const SPECIAL_RESET: u8 = 0x08;

/// The fixed part of a VBM file. Fields the player has no use for are kept so a host can show
/// them.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayHeader {
    pub version: u32,
    /// Identifies the movie/savestate pair. Doubles as the recording time.
    pub uid: u32,
    pub frames: u32,
    pub rerecords: u32,
    pub start_flags: u8,
    pub controller_flags: u8,
    pub system_flags: u8,
    pub emulator_options: u8,
    pub minor_version: u8,
    pub rom_crc: u8,
    pub rom_checksum: u16,
    pub game_code: u32,
    pub savestate_offset: u32,
    pub controller_offset: u32,
    pub author: InlineString<64>,
    pub description: InlineString<128>,
}

/// One frame of recorded input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayFrame {
    pub buttons: Buttons,
    /// The machine is reset before this frame's input is applied.
    pub reset: bool,
}

/// Little endian reads over the raw file. Running out of bytes inside the header is a format
/// error.
struct Reader<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    fn bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let digest = self
            .data
            .get(self.index..)
            .and_then(|rest| rest.first_chunk::<N>())
            .copied()
            .ok_or_else(|| Error::invalid("replay header is truncated"))?;
        self.index += N;
        Ok(digest)
    }

    fn byte(&mut self) -> Result<u8> {
        self.bytes::<1>().map(|[b]| b)
    }

    fn u16(&mut self) -> Result<u16> {
        self.bytes().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        self.bytes().map(u32::from_le_bytes)
    }

    /// Reads a fixed size, NUL padded text field. Whatever does not fit is dropped.
    fn text<const N: usize>(&mut self) -> Result<InlineString<N>> {
        let raw = self.bytes::<N>()?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(N);
        let mut digest = InlineString::new();
        for c in String::from_utf8_lossy(&raw[..end]).chars() {
            if digest.push(c).is_err() {
                break;
            }
        }
        Ok(digest)
    }
}

impl ReplayHeader {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader { data, index: 0 };
        let magic = reader.u32()?;
        if magic != VBM_MAGIC {
            return Err(Error::invalid(format!(
                "bad replay magic 0x{magic:0>8X}, expected 0x{VBM_MAGIC:0>8X}"
            )));
        }
        let version = reader.u32()?;
        let uid = reader.u32()?;
        let frames = reader.u32()?;
        let rerecords = reader.u32()?;
        let start_flags = reader.byte()?;
        let controller_flags = reader.byte()?;
        let system_flags = reader.byte()?;
        let emulator_options = reader.byte()?;
        // Reserved words and the ROM name
        for _ in 0..6 {
            reader.u32()?;
        }
        let minor_version = reader.byte()?;
        let rom_crc = reader.byte()?;
        let rom_checksum = reader.u16()?;
        let game_code = reader.u32()?;
        let savestate_offset = reader.u32()?;
        let controller_offset = reader.u32()?;
        let author = reader.text()?;
        let description = reader.text()?;
        Ok(Self {
            version,
            uid,
            frames,
            rerecords,
            start_flags,
            controller_flags,
            system_flags,
            emulator_options,
            minor_version,
            rom_crc,
            rom_checksum,
            game_code,
            savestate_offset,
            controller_offset,
            author,
            description,
        })
    }
}

/// Feeds recorded input back into the machine, one record per frame.
#[serde_as]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayPlayer {
    header: Option<ReplayHeader>,
    #[serde_as(as = "serde_with::Bytes")]
    data: Vec<u8>,
    index: usize,
    running: bool,
}

impl ReplayPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a movie and readies it for playback. If the file is rejected, the player is left
    /// stopped and nothing else changes.
    pub fn load(&mut self, data: Vec<u8>) -> Result<()> {
        let header = match ReplayHeader::parse(&data) {
            Ok(header) => header,
            Err(err) => {
                warn!("Rejected replay: {err}");
                self.running = false;
                return Err(err);
            }
        };
        info!(
            "Starting replay of {} frames by \"{}\"",
            header.frames, header.author
        );
        self.index = header.controller_offset as usize;
        self.header = Some(header);
        self.data = data;
        self.running = true;
        Ok(())
    }

    pub fn header(&self) -> Option<&ReplayHeader> {
        self.header.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Takes the next record. Running out of data stops the player.
    pub fn next_frame(&mut self) -> Option<ReplayFrame> {
        if !self.running {
            return None;
        }
        let Some(&[pad, special]) = self
            .data
            .get(self.index..)
            .and_then(|rest| rest.first_chunk::<2>())
        else {
            info!("Replay finished");
            self.running = false;
            return None;
        };
        self.index += 2;
        Some(ReplayFrame {
            buttons: Buttons(pad),
            reset: special & SPECIAL_RESET != 0,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// The size of the fixed header, text included.
    pub(crate) const HEADER_LEN: usize = 0x40 + 192;

    /// Builds a movie whose controller data starts right after the header.
    pub(crate) fn build_vbm(records: &[[u8; 2]]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(VBM_MAGIC.to_le_bytes());
        data.extend(1u32.to_le_bytes());
        data.extend(0xDEAD_BEEFu32.to_le_bytes());
        data.extend((records.len() as u32).to_le_bytes());
        data.extend(7u32.to_le_bytes());
        data.extend([0, 1, 0, 0]);
        data.extend([0; 24]);
        data.extend([0, 0, 0, 0]);
        data.extend(0u32.to_le_bytes());
        data.extend(0u32.to_le_bytes());
        data.extend((HEADER_LEN as u32).to_le_bytes());
        let mut author = [0u8; 64];
        author[..5].copy_from_slice(b"Casey");
        data.extend(author);
        let mut description = [0u8; 128];
        description[..11].copy_from_slice(b"Any% speedy");
        data.extend(description);
        assert_eq!(data.len(), HEADER_LEN);
        for record in records {
            data.extend(record);
        }
        data
    }

    #[test]
    fn header_fields() {
        let mut player = ReplayPlayer::new();
        player.load(build_vbm(&[[0x01, 0x00]])).unwrap();
        let header = player.header().unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.uid, 0xDEAD_BEEF);
        assert_eq!(header.frames, 1);
        assert_eq!(header.rerecords, 7);
        assert_eq!(header.controller_flags, 1);
        assert_eq!(header.controller_offset as usize, HEADER_LEN);
        assert_eq!(header.author.as_str(), "Casey");
        assert_eq!(header.description.as_str(), "Any% speedy");
    }

    #[test]
    fn plays_records_until_the_end() {
        let mut player = ReplayPlayer::new();
        player
            .load(build_vbm(&[[0x81, 0x00], [0x00, 0x08]]))
            .unwrap();
        assert!(player.is_running());
        assert_eq!(
            player.next_frame(),
            Some(ReplayFrame {
                buttons: Buttons::A | Buttons::DOWN,
                reset: false
            })
        );
        assert_eq!(
            player.next_frame(),
            Some(ReplayFrame {
                buttons: Buttons::NONE,
                reset: true
            })
        );
        assert_eq!(player.next_frame(), None);
        assert!(!player.is_running());
    }

    #[test_log::test]
    fn bad_magic_is_rejected() {
        let mut data = build_vbm(&[[0x01, 0x00]]);
        data[0] = b'X';
        let mut player = ReplayPlayer::new();
        let err = player.load(data).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert!(!player.is_running());
        assert!(player.header().is_none());
        assert_eq!(player.next_frame(), None);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let data = build_vbm(&[])[..40].to_vec();
        let mut player = ReplayPlayer::new();
        assert!(matches!(player.load(data), Err(Error::InvalidFormat(_))));
    }
}
