use std::path::PathBuf;

use crate::engine::{EngineSnapshot, TransportState};
use crate::format::FormatDescriptor;
use crate::sink::CounterSnapshot;

/// Reason why playback of a file ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEndReason {
    /// The engine ran out of samples.
    Eof,
    /// The user stopped playback or replaced the file.
    Stopped,
    /// The output device failed.
    Error,
}

/// Snapshot of the current session for UIs and progress logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerStatus {
    pub path: PathBuf,
    pub state: TransportState,
    pub cursor: u32,
    pub data_size: u32,
    /// Elapsed playback time in milliseconds.
    pub position_ms: u64,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub device: String,
    pub underrun_events: u64,
    pub underrun_frames: u64,
    pub end_reason: Option<PlaybackEndReason>,
}

impl PlayerStatus {
    pub(crate) fn new(
        path: PathBuf,
        format: &FormatDescriptor,
        engine: EngineSnapshot,
        device: &str,
        counters: CounterSnapshot,
        end_reason: Option<PlaybackEndReason>,
    ) -> Self {
        let to_ms = |bytes: u32| format.bytes_to_ms(u64::from(bytes)).unwrap_or(0);
        Self {
            path,
            state: engine.state,
            cursor: engine.cursor,
            data_size: engine.data_size,
            position_ms: to_ms(engine.cursor),
            duration_ms: to_ms(engine.data_size),
            sample_rate: format.sample_rate_hz,
            channels: format.channels,
            bits_per_sample: format.bits_per_sample,
            device: device.to_string(),
            underrun_events: counters.underrun_events,
            underrun_frames: counters.underrun_frames,
            end_reason,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Completed fraction in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.data_size == 0 {
            return 1.0;
        }
        (f64::from(self.cursor) / f64::from(self.data_size)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{SampleFormat, WAVE_FORMAT_PCM};

    fn format() -> FormatDescriptor {
        FormatDescriptor {
            audio_format_tag: WAVE_FORMAT_PCM,
            channels: 2,
            sample_rate_hz: 48_000,
            byte_rate: 192_000,
            block_align: 4,
            bits_per_sample: 16,
            sample_format: SampleFormat::S16,
        }
    }

    #[test]
    fn status_derives_times_from_cursor() {
        let status = PlayerStatus::new(
            PathBuf::from("a.wav"),
            &format(),
            EngineSnapshot {
                state: TransportState::Paused,
                cursor: 96_000,
                data_size: 384_000,
            },
            "Speakers",
            CounterSnapshot::default(),
            None,
        );
        assert_eq!(status.position_ms, 500);
        assert_eq!(status.duration_ms, 2000);
        assert!(!status.is_playing());
        assert!((status.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn empty_file_reports_complete() {
        let status = PlayerStatus::new(
            PathBuf::from("empty.wav"),
            &format(),
            EngineSnapshot {
                state: TransportState::Finished,
                cursor: 0,
                data_size: 0,
            },
            "Speakers",
            CounterSnapshot::default(),
            Some(PlaybackEndReason::Eof),
        );
        assert_eq!(status.progress(), 1.0);
        assert_eq!(status.end_reason, Some(PlaybackEndReason::Eof));
    }
}
