//! Audio sink abstraction consumed by [`crate::session::PlaybackSession`].
//!
//! A sink is opened already wired to an engine's pull callback; closing it is `Drop`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Output facility that pulls from a [`crate::engine::PlaybackEngine`].
pub trait AudioSink {
    /// Suspend (`true`) or resume (`false`) pulling.
    fn set_paused(&self, paused: bool) -> Result<()>;

    /// Human-readable device name.
    fn description(&self) -> &str;

    /// Underrun counters maintained by the pull callback.
    fn counters(&self) -> CounterSnapshot;
}

/// Counters written by the audio callback, read by the transport.
#[derive(Debug, Default)]
pub struct SinkCounters {
    underrun_events: AtomicU64,
    underrun_frames: AtomicU64,
}

/// Point-in-time copy of [`SinkCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Pulls that had to pad with silence.
    pub underrun_events: u64,
    /// Frames of silence emitted while playing.
    pub underrun_frames: u64,
}

impl SinkCounters {
    pub fn record_underrun(&self, frames: u64) {
        self.underrun_events.fetch_add(1, Ordering::Relaxed);
        self.underrun_frames.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            underrun_events: self.underrun_events.load(Ordering::Relaxed),
            underrun_frames: self.underrun_frames.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let c = SinkCounters::default();
        c.record_underrun(128);
        c.record_underrun(2);
        assert_eq!(
            c.snapshot(),
            CounterSnapshot {
                underrun_events: 2,
                underrun_frames: 130,
            }
        );
    }
}
