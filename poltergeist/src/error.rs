use std::path::PathBuf;

/// Every failure the core can surface to a host. Ordinary hardware edge cases (writes to locked
/// video memory, reads of disabled cartridge RAM) are not errors and never show up here.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum Error {
    /// A cartridge, boot image, save state, or replay path does not exist.
    #[display("file not found: {}", path.display())]
    #[from(ignore)]
    FileNotFound { path: PathBuf },
    /// The data handed to the core can not be interpreted (bad replay magic, truncated state,
    /// short cartridge, etc).
    #[display("invalid format: {_0}")]
    #[from(ignore)]
    InvalidFormat(#[error(not(source))] String),
    /// The opcode at `pc` has no defined behavior. The program counter is left on the offending
    /// byte.
    #[display("unimplemented opcode 0x{opcode:0>2X} @ 0x{pc:0>4X}: {registers}")]
    #[from(ignore)]
    UnimplementedOpcode {
        opcode: u8,
        pc: u16,
        registers: String,
    },
    /// Reading or writing a state or replay stream failed.
    #[display("stream I/O failure: {_0}")]
    StreamIo(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Converts an I/O error raised while opening `path` into the matching variant.
    pub fn from_open(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound { path: path.into() },
            _ => Self::StreamIo(err),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidFormat(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn missing_files_map_to_file_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from_open(err, "missing.gb");
        assert!(matches!(err, Error::FileNotFound { .. }));
        assert_eq!(err.to_string(), "file not found: missing.gb");
    }

    #[test]
    fn other_io_errors_are_stream_failures() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = Error::from_open(err, "locked.gb");
        assert!(matches!(err, Error::StreamIo(_)));
    }
}
