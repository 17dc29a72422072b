use crate::riff::ChunkAlignment;
use crate::wav::{ParseOptions, RiffSizePolicy};

/// Default rewind/fast-forward increment in bytes.
pub const DEFAULT_SEEK_STEP_BYTES: u32 = 5000;

/// Default output buffer size in frames.
pub const DEFAULT_BUFFER_FRAMES: u32 = 4096;

/// Per-file playback tuning shared by the parser, engine and sink.
#[derive(Clone, Debug)]
pub struct PlaybackConfig {
    /// Requested device buffer size in frames (clamped to what the device supports).
    pub buffer_frames: u32,
    /// Rewind/fast-forward increment in bytes, rounded down to whole frames.
    pub seek_step_bytes: u32,
    /// Container parser options.
    pub parse: ParseOptions,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            seek_step_bytes: DEFAULT_SEEK_STEP_BYTES,
            parse: ParseOptions {
                alignment: ChunkAlignment::Padded,
                riff_size: RiffSizePolicy::Advisory,
            },
        }
    }
}
