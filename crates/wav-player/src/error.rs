//! Error taxonomy for loading and playing a WAV file.
//!
//! Every variant renders as a single human-readable diagnostic line; the CLI prints
//! it verbatim before exiting with status 1.

use std::io;
use std::path::PathBuf;

/// Terminal failure of one load or playback-setup attempt.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or wrong RIFF/WAVE markers, malformed `fmt ` chunk, or a zero
    /// channel count / sample rate.
    #[error("Invalid WAV file format: {0}")]
    ContainerInvalid(String),

    #[error("Failed to find format chunk")]
    FormatChunkMissing,

    #[error("Failed to find data chunk")]
    DataChunkMissing,

    /// The `data` chunk declares more bytes than the source holds.
    #[error("Failed to read audio data: {declared} bytes declared, {available} available")]
    TruncatedData { declared: u32, available: u64 },

    #[error("Only PCM format is supported (format tag {0})")]
    UnsupportedCodec(u16),

    #[error("Unsupported bit depth: {0} bits")]
    UnsupportedBitDepth(u16),

    #[error("Failed to open audio device: {0}")]
    DeviceUnavailable(String),

    #[error("'{}' inaccessible: {source}", path.display())]
    FileInaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap a device-layer failure, keeping the full context chain in the message.
    pub fn device(err: impl std::fmt::Display) -> Self {
        Error::DeviceUnavailable(format!("{err:#}"))
    }

    /// Short stable name used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ContainerInvalid(_) => "container_invalid",
            Error::FormatChunkMissing => "format_chunk_missing",
            Error::DataChunkMissing => "data_chunk_missing",
            Error::TruncatedData { .. } => "truncated_data",
            Error::UnsupportedCodec(_) => "unsupported_codec",
            Error::UnsupportedBitDepth(_) => "unsupported_bit_depth",
            Error::DeviceUnavailable(_) => "device_unavailable",
            Error::FileInaccessible { .. } => "file_inaccessible",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
