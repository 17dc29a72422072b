use std::path::PathBuf;

use anyhow::{Result, bail};
use wav_player::riff::ChunkAlignment;
use wav_player::wav::{ParseOptions, RiffSizePolicy};

pub use wav_player::config::PlaybackConfig;

use crate::cli::Args;

#[derive(Clone, Debug)]
pub struct PlayConfig {
    pub path: PathBuf,
    pub device: Option<String>,
    pub playback: PlaybackConfig,
}

#[derive(Clone, Debug)]
pub struct InteractiveConfig {
    pub files: Vec<PathBuf>,
    pub device: Option<String>,
    pub playback: PlaybackConfig,
}

/// What the binary was asked to do.
#[derive(Clone, Debug)]
pub enum Mode {
    ListDevices,
    Play(PlayConfig),
    Interactive(InteractiveConfig),
}

impl Mode {
    /// Resolve parsed arguments. Batch mode without exactly one file is a usage error.
    pub fn from_args(args: Args) -> Result<Self> {
        if args.list_devices {
            return Ok(Mode::ListDevices);
        }
        let playback = playback_config(&args);
        if args.interactive {
            return Ok(Mode::Interactive(InteractiveConfig {
                files: args.files,
                device: args.device,
                playback,
            }));
        }
        let mut files = args.files;
        if files.len() != 1 {
            bail!("Usage: wavplay <wav_file_path>");
        }
        Ok(Mode::Play(PlayConfig {
            path: files.remove(0),
            device: args.device,
            playback,
        }))
    }
}

fn playback_config(args: &Args) -> PlaybackConfig {
    PlaybackConfig {
        buffer_frames: args.buffer_frames,
        seek_step_bytes: args.seek_step_bytes,
        parse: ParseOptions {
            alignment: if args.packed_chunks {
                ChunkAlignment::Packed
            } else {
                ChunkAlignment::Padded
            },
            riff_size: if args.strict_riff_size {
                RiffSizePolicy::Strict
            } else {
                RiffSizePolicy::Advisory
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn mode(argv: &[&str]) -> Result<Mode> {
        Mode::from_args(Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn batch_needs_exactly_one_file() {
        assert!(mode(&["wavplay"]).is_err());
        assert!(mode(&["wavplay", "a.wav", "b.wav"]).is_err());
        match mode(&["wavplay", "a.wav"]).unwrap() {
            Mode::Play(cfg) => assert_eq!(cfg.path, PathBuf::from("a.wav")),
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn interactive_accepts_empty_playlist() {
        match mode(&["wavplay", "--interactive"]).unwrap() {
            Mode::Interactive(cfg) => assert!(cfg.files.is_empty()),
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn list_devices_wins_over_files() {
        assert!(matches!(
            mode(&["wavplay", "--list-devices", "a.wav", "b.wav"]).unwrap(),
            Mode::ListDevices
        ));
    }

    #[test]
    fn parse_flags_map_to_options() {
        let Mode::Play(cfg) = mode(&["wavplay", "--packed-chunks", "--strict-riff-size", "a.wav"]).unwrap() else {
            panic!("expected batch mode");
        };
        assert_eq!(cfg.playback.parse.alignment, ChunkAlignment::Packed);
        assert_eq!(cfg.playback.parse.riff_size, RiffSizePolicy::Strict);

        let Mode::Play(cfg) = mode(&["wavplay", "a.wav"]).unwrap() else {
            panic!("expected batch mode");
        };
        assert_eq!(cfg.playback.parse, ParseOptions::default());
        assert_eq!(cfg.playback.buffer_frames, 4096);
    }
}
