use std::path::PathBuf;

use clap::Parser;
use wav_player::config::{DEFAULT_BUFFER_FRAMES, DEFAULT_SEEK_STEP_BYTES};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "wavplay", version = VERSION, about = "Play uncompressed PCM WAV files")]
pub struct Args {
    /// WAV files to play. Batch mode takes exactly one.
    pub files: Vec<PathBuf>,

    /// Open the terminal transport (space: pause/play, r/left: rewind, f/right: fast-forward,
    /// n/p: next/previous file, q: quit)
    #[arg(long)]
    pub interactive: bool,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match
    #[arg(long)]
    pub device: Option<String>,

    /// Output buffer size in frames, clamped to what the device supports
    #[arg(long, default_value_t = DEFAULT_BUFFER_FRAMES)]
    pub buffer_frames: u32,

    /// Rewind/fast-forward increment in bytes (rounded down to whole frames)
    #[arg(long, default_value_t = DEFAULT_SEEK_STEP_BYTES)]
    pub seek_step_bytes: u32,

    /// Skip chunks by their declared size only, ignoring the RIFF pad byte
    #[arg(long)]
    pub packed_chunks: bool,

    /// Reject chunks that extend past the declared RIFF size
    #[arg(long)]
    pub strict_riff_size: bool,

    /// Write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Exit status for a failed parse: 0 for `--help`/`--version`, 1 for usage errors.
pub fn exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() { 1 } else { 0 }
}
