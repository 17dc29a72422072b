//! Playback engine: a byte cursor over the sample buffer plus transport state.
//!
//! Two callers share one engine:
//! - the audio callback calls [`PlaybackEngine::pull`] from the real-time thread
//! - the transport (UI or batch loop) calls pause/resume/seek from the main thread
//!
//! Cursor and transport state live in a single `AtomicU64` (cursor in the low 32 bits,
//! state tag above it) and every mutation is one compare-and-swap, so neither side can
//! observe a half-applied update and the callback never waits on a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::format::FormatDescriptor;
use crate::wav::{SampleBuffer, WavFile};

/// Transport state of an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    /// Loaded but not started.
    Stopped,
    Playing,
    /// Paused by the user.
    Paused,
    /// A pull ran out of samples.
    Finished,
}

impl TransportState {
    fn tag(self) -> u64 {
        match self {
            TransportState::Stopped => 0,
            TransportState::Playing => 1,
            TransportState::Paused => 2,
            TransportState::Finished => 3,
        }
    }

    fn from_tag(tag: u64) -> Self {
        match tag {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            3 => TransportState::Finished,
            _ => TransportState::Stopped,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransportState::Stopped => "stopped",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
            TransportState::Finished => "finished",
        }
    }
}

const CURSOR_MASK: u64 = 0xFFFF_FFFF;
const STATE_SHIFT: u32 = 32;

fn pack(state: TransportState, cursor: u32) -> u64 {
    (state.tag() << STATE_SHIFT) | u64::from(cursor)
}

fn unpack(word: u64) -> (TransportState, u32) {
    (
        TransportState::from_tag(word >> STATE_SHIFT),
        (word & CURSOR_MASK) as u32,
    )
}

/// What one [`PlaybackEngine::pull`] produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullOutcome {
    /// Sample bytes copied from the buffer.
    pub copied: usize,
    /// Bytes filled with silence.
    pub silence: usize,
    /// This pull exhausted the buffer; the sink should be paused.
    pub finished: bool,
}

/// Consistent view of cursor and state taken from one atomic load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub state: TransportState,
    pub cursor: u32,
    pub data_size: u32,
}

impl EngineSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }
}

/// Cursor-driven PCM source for a pull-based audio sink.
pub struct PlaybackEngine {
    format: FormatDescriptor,
    samples: SampleBuffer,
    data_size: u32,
    frame_bytes: u32,
    seek_step: u32,
    word: AtomicU64,
}

impl PlaybackEngine {
    /// Build an engine in the `Stopped` state.
    ///
    /// `seek_step_bytes` is rounded down to whole frames, with a floor of one frame.
    pub fn new(wav: WavFile, seek_step_bytes: u32) -> Self {
        let data_size = u32::try_from(wav.samples.len()).unwrap_or(u32::MAX);
        let frame_bytes = (wav.format.frame_bytes() as u32).max(1);
        Self {
            format: wav.format,
            samples: wav.samples,
            data_size,
            frame_bytes,
            seek_step: align_step(seek_step_bytes, frame_bytes),
            word: AtomicU64::new(pack(TransportState::Stopped, 0)),
        }
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Rewind/fast-forward increment in bytes, already frame aligned.
    pub fn seek_step(&self) -> u32 {
        self.seek_step
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let (state, cursor) = unpack(self.word.load(Ordering::Acquire));
        EngineSnapshot {
            state,
            cursor,
            data_size: self.data_size,
        }
    }

    pub fn state(&self) -> TransportState {
        self.snapshot().state
    }

    pub fn cursor(&self) -> u32 {
        self.snapshot().cursor
    }

    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    /// Start playback from the first byte.
    pub fn start(&self) {
        self.word
            .store(pack(TransportState::Playing, 0), Ordering::Release);
    }

    /// Fill `out` from the cursor and advance it.
    ///
    /// Outside `Playing` the whole buffer is silence and the cursor stays put. When fewer
    /// bytes remain than requested, the tail is silence and the engine moves to `Finished`
    /// in the same atomic step that advances the cursor.
    pub fn pull(&self, out: &mut [u8]) -> PullOutcome {
        let requested = out.len();
        let silence = self.format.sample_format.silence_byte();
        let data_size = self.data_size;
        let take = |cursor: u32| -> u32 {
            let remaining = data_size - cursor;
            u32::try_from(requested).map_or(remaining, |r| r.min(remaining))
        };

        let prev = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (state, cursor) = unpack(word);
                if state != TransportState::Playing {
                    return None;
                }
                let n = take(cursor);
                let next = if (n as usize) < requested {
                    TransportState::Finished
                } else {
                    TransportState::Playing
                };
                Some(pack(next, cursor + n))
            });

        let Ok(prev) = prev else {
            out.fill(silence);
            return PullOutcome {
                copied: 0,
                silence: requested,
                finished: false,
            };
        };

        let (_, cursor) = unpack(prev);
        let n = take(cursor) as usize;
        let start = cursor as usize;
        out[..n].copy_from_slice(&self.samples.as_bytes()[start..start + n]);
        out[n..].fill(silence);
        PullOutcome {
            copied: n,
            silence: requested - n,
            finished: n < requested,
        }
    }

    /// Flip between playing and paused. Returns the new `is_playing` value.
    ///
    /// Resuming from `Finished` keeps the cursor where it is. A `Stopped` engine is
    /// left alone.
    pub fn toggle_pause(&self) -> bool {
        self.transition(|state| match state {
            TransportState::Playing => Some(TransportState::Paused),
            TransportState::Paused | TransportState::Finished => Some(TransportState::Playing),
            TransportState::Stopped => None,
        })
        .is_playing()
    }

    pub fn pause(&self) -> bool {
        self.transition(|state| match state {
            TransportState::Playing => Some(TransportState::Paused),
            _ => None,
        })
        .is_playing()
    }

    pub fn resume(&self) -> bool {
        self.transition(|state| match state {
            TransportState::Paused | TransportState::Finished => Some(TransportState::Playing),
            _ => None,
        })
        .is_playing()
    }

    /// Move the cursor back by the configured step, stopping at 0.
    pub fn rewind(&self) -> u32 {
        self.seek_relative(-i64::from(self.seek_step))
    }

    /// Move the cursor forward by the configured step, stopping at the last frame.
    pub fn fast_forward(&self) -> u32 {
        self.seek_relative(i64::from(self.seek_step))
    }

    /// Move the cursor by `delta_bytes` (rounded down to whole frames) and return it.
    ///
    /// Backward moves clamp at 0. A forward move that would reach the end of the buffer
    /// lands on the start of the last frame instead. The transport state is untouched.
    pub fn seek_relative(&self, delta_bytes: i64) -> u32 {
        let magnitude = u32::try_from(delta_bytes.unsigned_abs()).unwrap_or(u32::MAX);
        let step = if magnitude == 0 {
            0
        } else {
            align_step(magnitude, self.frame_bytes)
        };
        let data_size = self.data_size;
        let last_frame = self.last_frame_start();

        let target = |cursor: u32| -> u32 {
            if delta_bytes < 0 {
                cursor.saturating_sub(step)
            } else {
                match cursor.checked_add(step) {
                    Some(next) if next < data_size => next,
                    _ => last_frame,
                }
            }
        };

        let prev = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (state, cursor) = unpack(word);
                Some(pack(state, target(cursor)))
            })
            .unwrap_or_else(|w| w);
        let new_cursor = target(unpack(prev).1);
        tracing::debug!(delta_bytes, cursor = new_cursor, "seek");
        new_cursor
    }

    /// Total playback time in milliseconds.
    pub fn duration_ms(&self) -> Result<u64> {
        self.format.bytes_to_ms(u64::from(self.data_size))
    }

    /// Playback time up to the cursor in milliseconds.
    pub fn position_ms(&self) -> Result<u64> {
        self.format.bytes_to_ms(u64::from(self.cursor()))
    }

    fn last_frame_start(&self) -> u32 {
        if self.data_size == 0 {
            0
        } else {
            (self.data_size - 1) / self.frame_bytes * self.frame_bytes
        }
    }

    fn transition(&self, f: impl Fn(TransportState) -> Option<TransportState>) -> EngineSnapshot {
        let result = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (state, cursor) = unpack(word);
                f(state).map(|next| pack(next, cursor))
            });
        let word = match result {
            Ok(prev) => {
                let (state, cursor) = unpack(prev);
                f(state).map_or(prev, |next| pack(next, cursor))
            }
            Err(current) => current,
        };
        let (state, cursor) = unpack(word);
        EngineSnapshot {
            state,
            cursor,
            data_size: self.data_size,
        }
    }
}

fn align_step(step: u32, frame_bytes: u32) -> u32 {
    (step / frame_bytes * frame_bytes).max(frame_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{SampleFormat, WAVE_FORMAT_PCM};
    use std::sync::Arc;

    fn wav(channels: u16, rate: u32, bits: u16, data: Vec<u8>) -> WavFile {
        let sample_format = SampleFormat::from_bits(bits).unwrap();
        let frame = channels * (bits / 8);
        WavFile {
            format: FormatDescriptor {
                audio_format_tag: WAVE_FORMAT_PCM,
                channels,
                sample_rate_hz: rate,
                byte_rate: rate * u32::from(frame),
                block_align: frame,
                bits_per_sample: bits,
                sample_format,
            },
            samples: SampleBuffer::new(data),
        }
    }

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    fn playing(engine: PlaybackEngine) -> PlaybackEngine {
        engine.start();
        engine
    }

    #[test]
    fn starts_stopped_and_outputs_silence() {
        let engine = PlaybackEngine::new(wav(1, 8_000, 8, ramp(10)), 4);
        assert_eq!(engine.state(), TransportState::Stopped);
        let mut out = [0u8; 4];
        let outcome = engine.pull(&mut out);
        assert_eq!(outcome.copied, 0);
        assert!(!outcome.finished);
        assert_eq!(out, [0x80; 4]);
        assert_eq!(engine.cursor(), 0);
    }

    #[test]
    fn pull_copies_and_advances() {
        let engine = playing(PlaybackEngine::new(wav(2, 8_000, 16, ramp(16)), 4));
        let mut out = [0u8; 8];
        let outcome = engine.pull(&mut out);
        assert_eq!(outcome, PullOutcome { copied: 8, silence: 0, finished: false });
        assert_eq!(&out, &ramp(16)[..8]);
        assert_eq!(engine.cursor(), 8);
        assert!(engine.is_playing());
    }

    #[test]
    fn byte_accounting_is_exact() {
        let data = ramp(1003);
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, data.clone()), 100));
        let mut delivered = Vec::new();
        let mut out = [0u8; 64];
        loop {
            let outcome = engine.pull(&mut out);
            delivered.extend_from_slice(&out[..outcome.copied]);
            if outcome.finished {
                break;
            }
        }
        assert_eq!(delivered.len(), 1003);
        assert_eq!(delivered, data);
        assert_eq!(engine.state(), TransportState::Finished);
        assert_eq!(engine.cursor(), 1003);
    }

    #[test]
    fn underrun_pads_with_u8_midpoint() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, vec![1, 2, 3]), 1));
        let mut out = [0u8; 8];
        let outcome = engine.pull(&mut out);
        assert_eq!(outcome, PullOutcome { copied: 3, silence: 5, finished: true });
        assert_eq!(out, [1, 2, 3, 128, 128, 128, 128, 128]);
        assert_eq!(engine.state(), TransportState::Finished);
    }

    #[test]
    fn underrun_pads_with_zero_for_signed_formats() {
        for bits in [16u16, 24, 32] {
            let frame = usize::from(bits / 8);
            let engine = playing(PlaybackEngine::new(wav(1, 8_000, bits, vec![0xFF; frame]), 1));
            let mut out = vec![0x55u8; frame * 4];
            let outcome = engine.pull(&mut out);
            assert!(outcome.finished);
            assert!(out[..frame].iter().all(|&b| b == 0xFF));
            assert!(out[frame..].iter().all(|&b| b == 0), "bits={bits}");
        }
    }

    #[test]
    fn exact_drain_finishes_on_next_pull() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, ramp(4)), 1));
        let mut out = [0u8; 4];
        assert!(!engine.pull(&mut out).finished);
        assert_eq!(engine.cursor(), 4);
        let outcome = engine.pull(&mut out);
        assert!(outcome.finished);
        assert_eq!(outcome.copied, 0);
        assert_eq!(out, [0x80; 4]);
    }

    #[test]
    fn finished_engine_keeps_outputting_silence() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 16, vec![1, 1]), 2));
        let mut out = [7u8; 4];
        assert!(engine.pull(&mut out).finished);
        let outcome = engine.pull(&mut out);
        assert_eq!(outcome.copied, 0);
        assert!(!outcome.finished);
        assert_eq!(out, [0; 4]);
    }

    #[test]
    fn pause_holds_cursor() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, ramp(32)), 4));
        let mut out = [0u8; 8];
        engine.pull(&mut out);
        assert!(!engine.toggle_pause());
        assert_eq!(engine.state(), TransportState::Paused);
        let outcome = engine.pull(&mut out);
        assert_eq!(outcome.copied, 0);
        assert_eq!(engine.cursor(), 8);
        assert!(engine.toggle_pause());
        engine.pull(&mut out);
        assert_eq!(engine.cursor(), 16);
    }

    #[test]
    fn toggle_on_stopped_engine_is_noop() {
        let engine = PlaybackEngine::new(wav(1, 8_000, 8, ramp(8)), 4);
        assert!(!engine.toggle_pause());
        assert_eq!(engine.state(), TransportState::Stopped);
    }

    #[test]
    fn explicit_pause_and_resume_are_idempotent() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, ramp(8)), 4));
        assert!(!engine.pause());
        assert!(!engine.pause());
        assert!(engine.resume());
        assert!(engine.resume());
        assert_eq!(engine.state(), TransportState::Playing);
    }

    #[test]
    fn resume_after_finish_continues_from_rewound_cursor() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, ramp(10)), 4));
        let mut out = [0u8; 16];
        assert!(engine.pull(&mut out).finished);
        engine.rewind();
        assert_eq!(engine.state(), TransportState::Finished);
        assert_eq!(engine.cursor(), 6);
        assert!(engine.toggle_pause());
        let outcome = engine.pull(&mut out);
        assert_eq!(outcome.copied, 4);
        assert_eq!(&out[..4], &ramp(10)[6..]);
    }

    #[test]
    fn rewind_clamps_at_zero() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, ramp(100)), 5000));
        assert_eq!(engine.rewind(), 0);
        let mut out = [0u8; 30];
        engine.pull(&mut out);
        assert_eq!(engine.rewind(), 0);
        assert!(engine.is_playing());
    }

    #[test]
    fn fast_forward_clamps_to_last_byte_for_8_bit_mono() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, ramp(100)), 10));
        assert_eq!(engine.seek_relative(99), 99);
        assert_eq!(engine.fast_forward(), 99);
        assert_eq!(engine.fast_forward(), 99);
        assert!(engine.is_playing());
    }

    #[test]
    fn fast_forward_lands_on_last_frame_start() {
        let engine = playing(PlaybackEngine::new(wav(2, 8_000, 16, ramp(40)), 16));
        assert_eq!(engine.fast_forward(), 16);
        assert_eq!(engine.fast_forward(), 32);
        assert_eq!(engine.fast_forward(), 36);
        assert_eq!(engine.cursor() % 4, 0);
    }

    #[test]
    fn seek_steps_round_to_frames() {
        let engine = PlaybackEngine::new(wav(2, 44_100, 24, ramp(600)), 5000);
        assert_eq!(engine.seek_step(), 4998);
        let engine = PlaybackEngine::new(wav(2, 44_100, 16, ramp(600)), 1);
        assert_eq!(engine.seek_step(), 4);
        assert_eq!(engine.seek_relative(7), 4);
        assert_eq!(engine.seek_relative(-3), 0);
    }

    #[test]
    fn seeks_do_not_change_state() {
        let engine = PlaybackEngine::new(wav(1, 8_000, 8, ramp(50)), 10);
        engine.fast_forward();
        assert_eq!(engine.state(), TransportState::Stopped);
        engine.start();
        engine.pause();
        engine.fast_forward();
        assert_eq!(engine.state(), TransportState::Paused);
    }

    #[test]
    fn empty_buffer_finishes_immediately() {
        let engine = playing(PlaybackEngine::new(wav(1, 8_000, 8, Vec::new()), 10));
        assert_eq!(engine.fast_forward(), 0);
        assert_eq!(engine.rewind(), 0);
        let mut out = [0u8; 4];
        assert!(engine.pull(&mut out).finished);
        assert_eq!(engine.duration_ms().unwrap(), 0);
    }

    #[test]
    fn duration_and_position() {
        let engine = PlaybackEngine::new(wav(1, 44_100, 16, vec![0; 88_200]), 5000);
        assert_eq!(engine.duration_ms().unwrap(), 1000);
        engine.start();
        let mut out = vec![0u8; 44_100];
        engine.pull(&mut out);
        assert_eq!(engine.position_ms().unwrap(), 500);
    }

    #[test]
    fn cursor_stays_in_bounds_under_mixed_operations() {
        let engine = playing(PlaybackEngine::new(wav(2, 8_000, 16, ramp(1_000)), 12));
        let mut seed: u32 = 0x1234_5678;
        let mut out = vec![0u8; 64];
        for _ in 0..5_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            match seed >> 29 {
                0 | 1 | 2 => {
                    let len = (seed as usize >> 8) % 64;
                    engine.pull(&mut out[..len]);
                }
                3 => {
                    engine.rewind();
                }
                4 => {
                    engine.fast_forward();
                }
                5 => {
                    engine.toggle_pause();
                }
                _ => {
                    engine.seek_relative(i64::from(seed % 2_000) - 1_000);
                }
            }
            let snap = engine.snapshot();
            assert!(snap.cursor <= snap.data_size);
        }
    }

    #[test]
    fn concurrent_pull_and_seek_never_tear() {
        let engine = Arc::new(playing(PlaybackEngine::new(wav(1, 8_000, 8, ramp(4_096)), 64)));
        std::thread::scope(|s| {
            let puller = engine.clone();
            s.spawn(move || {
                let mut out = [0u8; 32];
                for _ in 0..20_000 {
                    puller.pull(&mut out);
                    if puller.state() == TransportState::Finished {
                        puller.resume();
                    }
                }
            });
            let seeker = engine.clone();
            s.spawn(move || {
                for i in 0..20_000 {
                    if i % 2 == 0 {
                        seeker.fast_forward();
                    } else {
                        seeker.rewind();
                    }
                    assert!(seeker.cursor() <= seeker.data_size());
                }
            });
        });
        assert!(engine.cursor() <= engine.data_size());
    }

    #[test]
    fn pack_round_trips_every_state() {
        for state in [
            TransportState::Stopped,
            TransportState::Playing,
            TransportState::Paused,
            TransportState::Finished,
        ] {
            assert_eq!(unpack(pack(state, u32::MAX)), (state, u32::MAX));
            assert_eq!(unpack(pack(state, 0)), (state, 0));
        }
    }
}
