//! One loaded file bound to one open sink.
//!
//! A session owns the engine, the sink pulling from it, and the end-of-stream receiver.
//! Loading either yields a fully started session or nothing; dropping it closes the
//! sink before releasing the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::config::PlaybackConfig;
use crate::engine::{PlaybackEngine, TransportState};
use crate::error::Result;
use crate::playback::CpalSink;
use crate::sink::AudioSink;
use crate::status::{PlaybackEndReason, PlayerStatus};
use crate::wav::{self, WavFile};

pub struct PlaybackSession {
    // Field order is drop order: the stream goes away before the engine it pulls from.
    sink: Box<dyn AudioSink>,
    engine: Arc<PlaybackEngine>,
    eos_rx: Receiver<()>,
    path: PathBuf,
    end_reason: Option<PlaybackEndReason>,
}

impl PlaybackSession {
    /// Parse `path`, open `device` for its format and start playing from the beginning.
    pub fn load(path: &Path, config: &PlaybackConfig, device: &cpal::Device) -> Result<Self> {
        let file = wav::open_wav(path, &config.parse)?;
        Self::with_file(path, file, config, device)
    }

    /// Like [`PlaybackSession::load`] for a file that is already parsed.
    pub fn with_file(
        path: &Path,
        file: WavFile,
        config: &PlaybackConfig,
        device: &cpal::Device,
    ) -> Result<Self> {
        let duration_ms = file.duration_ms()?;
        let engine = Arc::new(PlaybackEngine::new(file, config.seek_step_bytes));
        let (eos_tx, eos_rx) = crossbeam_channel::bounded(1);
        let sink = CpalSink::open(device, engine.clone(), config.buffer_frames, eos_tx)?;
        tracing::info!(
            path = %path.display(),
            duration_ms,
            seek_step = engine.seek_step(),
            "playback starting"
        );
        Self::start(path.to_path_buf(), engine, Box::new(sink), eos_rx)
    }

    /// Start `engine` on an already opened `sink`.
    ///
    /// `eos_rx` must be the receiving side of the channel the sink signals end of
    /// stream on.
    pub fn start(
        path: PathBuf,
        engine: Arc<PlaybackEngine>,
        sink: Box<dyn AudioSink>,
        eos_rx: Receiver<()>,
    ) -> Result<Self> {
        engine.start();
        sink.set_paused(false)?;
        Ok(Self {
            sink,
            engine,
            eos_rx,
            path,
            end_reason: None,
        })
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn is_finished(&self) -> bool {
        self.engine.state() == TransportState::Finished
    }

    pub fn end_reason(&self) -> Option<PlaybackEndReason> {
        self.end_reason
    }

    /// Button text for the pause/play control.
    pub fn transport_label(&self) -> &'static str {
        if self.is_playing() { "Pause" } else { "Play" }
    }

    /// Pause when playing, resume otherwise. Returns the new playing flag.
    pub fn toggle_pause(&mut self) -> Result<bool> {
        let playing = self.engine.toggle_pause();
        if playing {
            self.end_reason = None;
        }
        if let Err(e) = self.sink.set_paused(!playing) {
            self.end_reason = Some(PlaybackEndReason::Error);
            return Err(e);
        }
        tracing::info!(playing, cursor = self.engine.cursor(), "transport toggled");
        Ok(playing)
    }

    pub fn rewind(&self) -> u32 {
        self.engine.rewind()
    }

    pub fn fast_forward(&self) -> u32 {
        self.engine.fast_forward()
    }

    /// Handle a pending end-of-stream notice from the audio callback.
    ///
    /// Pauses the sink once per notice. Returns whether the engine is finished.
    pub fn poll(&mut self) -> bool {
        if self.eos_rx.try_recv().is_ok() && self.is_finished() {
            if let Err(e) = self.sink.set_paused(true) {
                tracing::warn!("failed to pause sink at end of stream: {e}");
            }
            self.end_reason = Some(PlaybackEndReason::Eof);
            tracing::debug!(path = %self.path.display(), "playback completed");
        }
        self.is_finished()
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus::new(
            self.path.clone(),
            self.engine.format(),
            self.engine.snapshot(),
            self.sink.description(),
            self.sink.counters(),
            self.end_reason,
        )
    }

    /// Stop playback and close the sink.
    pub fn stop(mut self) -> PlaybackEndReason {
        let reason = self.end_reason.unwrap_or(PlaybackEndReason::Stopped);
        if let Err(e) = self.sink.set_paused(true) {
            tracing::debug!("pause before close failed: {e}");
        }
        self.end_reason = Some(reason);
        tracing::info!(path = %self.path.display(), reason = ?reason, "session closed");
        reason
    }
}
