//! Runtime entry points for the binary.
//!
//! Provides device enumeration, batch playback of one file, and the interactive transport.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use cpal::traits::DeviceTrait;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use wav_player::session::PlaybackSession;
use wav_player::status::PlaybackEndReason;
use wav_player::wav::FmtFields;
use wav_player::{device, wav};

use crate::config::{InteractiveConfig, PlayConfig};
use crate::ui;

/// Extra time past the nominal duration before batch playback gives up waiting for the sink.
const END_GRACE: Duration = Duration::from_millis(500);
const BATCH_POLL: Duration = Duration::from_millis(10);

/// List output devices and print them to stdout.
pub fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    device::list_devices(&host)
}

/// Install a Ctrl-C handler that raises the returned flag.
pub fn install_stop_flag() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!("ctrl-c handler not installed: {e}");
    }
    stop
}

/// Play one file to completion or until the user stops it.
///
/// Returns how playback ended. Parse and device failures surface as
/// [`wav_player::Error`] inside the returned error.
pub fn run_play(config: PlayConfig, stop: &AtomicBool) -> Result<PlaybackEndReason> {
    // Printed as soon as both chunks are found, so rejected formats still show it.
    let file = wav::open_wav_with(&config.path, &config.playback.parse, print_file_info)?;

    let host = cpal::default_host();
    let device = device::pick_device(&host, normalize_device_name(config.device).as_deref())
        .map_err(wav_player::Error::device)?;
    if let Ok(desc) = device.description() {
        tracing::info!(device = %desc, "output device");
    }

    let duration_ms = file.duration_ms()?;
    let mut session = PlaybackSession::with_file(&config.path, file, &config.playback, &device)?;

    println!("Playing audio... Duration: {duration_ms} ms");
    println!("Press any key to stop playback.");
    io::stdout().flush().ok();

    let keys = KeyWatch::start();
    let deadline = Instant::now() + Duration::from_millis(duration_ms) + END_GRACE;
    // Only `is_finished` inside raw mode; `poll` may log.
    let stopped_by_user = loop {
        if session.is_finished() {
            break false;
        }
        if stop.load(Ordering::SeqCst) || keys.key_pressed()? {
            break true;
        }
        if Instant::now() >= deadline {
            tracing::debug!(cursor = session.engine().cursor(), "end of stream not reported in time");
            break false;
        }
    };
    drop(keys);
    session.poll();

    let status = session.status();
    if status.underrun_events > 0 {
        tracing::debug!(frames = status.underrun_frames, "silence padded at end of stream");
    }
    session.stop();
    if stopped_by_user {
        println!("Playback stopped by user.");
        Ok(PlaybackEndReason::Stopped)
    } else {
        println!("Playback completed.");
        Ok(PlaybackEndReason::Eof)
    }
}

/// Run the terminal transport over the given playlist.
pub fn run_interactive(config: InteractiveConfig, stop: Arc<AtomicBool>) -> Result<()> {
    let host = cpal::default_host();
    let needle = normalize_device_name(config.device);
    let playback = config.playback;
    let loader = move |path: &std::path::Path| {
        let device = device::pick_device(&host, needle.as_deref()).map_err(wav_player::Error::device)?;
        PlaybackSession::load(path, &playback, &device)
    };
    ui::run_tui(config.files, Box::new(loader), stop)
}

fn print_file_info(format: &FmtFields, data_size: u32) {
    println!("WAV File Information:");
    println!("Channels: {}", format.channels);
    println!("Sample Rate: {} Hz", format.sample_rate_hz);
    println!("Bit Depth: {} bits", format.bits_per_sample);
    println!("Audio Format: {} (1 = PCM)", format.audio_format_tag);
    println!("Data Size: {data_size} bytes");
}

fn normalize_device_name(device: Option<String>) -> Option<String> {
    device.and_then(|name| {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Raw-mode keypress detection for batch playback.
///
/// Without a terminal (stdin redirected) key watching is off and only Ctrl-C or the end
/// of the file stops playback.
struct KeyWatch {
    raw: bool,
}

impl KeyWatch {
    fn start() -> Self {
        match terminal::enable_raw_mode() {
            Ok(()) => Self { raw: true },
            Err(e) => {
                tracing::debug!("key watch disabled: {e}");
                Self { raw: false }
            }
        }
    }

    /// Wait up to one poll interval for a keypress.
    fn key_pressed(&self) -> Result<bool> {
        if !self.raw {
            std::thread::sleep(BATCH_POLL);
            return Ok(false);
        }
        if !event::poll(BATCH_POLL)? {
            return Ok(false);
        }
        Ok(matches!(event::read()?, Event::Key(k) if k.kind == KeyEventKind::Press))
    }
}

impl Drop for KeyWatch {
    fn drop(&mut self) {
        if self.raw {
            terminal::disable_raw_mode().ok();
        }
    }
}
