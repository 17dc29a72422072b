//! Playback stage (CPAL output stream).
//!
//! Builds the CPAL output stream and provides the real-time audio callback.
//! The callback:
//! - pulls raw little-endian PCM bytes from the engine (lock-free)
//! - converts them to the device sample type
//! - reports end of stream through a bounded channel without blocking

use std::sync::Arc;

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::Sender;

use crate::device;
use crate::engine::PlaybackEngine;
use crate::error::Error;
use crate::format::SampleFormat;
use crate::sink::{AudioSink, CounterSnapshot, SinkCounters};

/// CPAL-backed [`AudioSink`]. Dropping it closes the stream.
pub struct CpalSink {
    stream: cpal::Stream,
    description: String,
    counters: Arc<SinkCounters>,
}

impl CpalSink {
    /// Open an output stream on `device` that pulls from `engine`.
    ///
    /// The engine is still `Stopped` at this point, so whatever the host does before
    /// [`AudioSink::set_paused`] is called, the callback only produces silence.
    /// `eos_tx` receives one message each time a pull exhausts the buffer.
    pub fn open(
        device: &cpal::Device,
        engine: Arc<PlaybackEngine>,
        buffer_frames: u32,
        eos_tx: Sender<()>,
    ) -> crate::Result<Self> {
        let format = *engine.format();
        let config = device::find_output_config(device, &format).map_err(Error::device)?;
        let mut stream_config: cpal::StreamConfig = config.clone().into();
        if let Some(buf) = device::pick_buffer_size(&config, buffer_frames) {
            stream_config.buffer_size = buf;
        }

        let description = device
            .description()
            .map(|d| d.to_string())
            .unwrap_or_else(|_| "unknown device".to_string());
        tracing::info!(
            device = %description,
            rate_hz = stream_config.sample_rate,
            channels = stream_config.channels,
            source_format = format.sample_format.label(),
            output_format = ?config.sample_format(),
            buffer_size = ?stream_config.buffer_size,
            "device output config"
        );

        let counters = Arc::new(SinkCounters::default());
        let stream = build_output_stream(
            device,
            &stream_config,
            config.sample_format(),
            StreamSource {
                engine,
                eos_tx,
                counters: counters.clone(),
                scratch_hint: buffer_frames as usize,
            },
        )
        .map_err(Error::device)?;

        Ok(Self {
            stream,
            description,
            counters,
        })
    }
}

impl AudioSink for CpalSink {
    fn set_paused(&self, paused: bool) -> crate::Result<()> {
        if paused {
            self.stream.pause().map_err(Error::device)
        } else {
            self.stream.play().map_err(Error::device)
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

/// Everything the callback owns.
struct StreamSource {
    engine: Arc<PlaybackEngine>,
    eos_tx: Sender<()>,
    counters: Arc<SinkCounters>,
    /// Frames to pre-size the byte scratch buffer for.
    scratch_hint: usize,
}

/// Build a CPAL output stream for the negotiated device sample format.
fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    source: StreamSource,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::U8 => build_stream::<u8>(device, config, source),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, source),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, source),
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, source),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

/// Type-specialized stream builder.
///
/// The callback sizes a byte scratch buffer for the request, pulls that many source
/// bytes from the engine, and converts them into `T`. The scratch buffer only grows,
/// so steady-state callbacks do not allocate.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    source: StreamSource,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample
        + cpal::FromSample<u8>
        + cpal::FromSample<i16>
        + cpal::FromSample<i32>
        + Send
        + 'static,
{
    let StreamSource {
        engine,
        eos_tx,
        counters,
        scratch_hint,
    } = source;
    let sample_format = engine.format().sample_format;
    let bytes_per_sample = sample_format.bytes_per_sample();
    let frame_bytes = engine.format().frame_bytes().max(1);
    let mut scratch: Vec<u8> =
        Vec::with_capacity(scratch_hint * usize::from(config.channels) * bytes_per_sample);

    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let needed = data.len() * bytes_per_sample;
            if scratch.len() < needed {
                scratch.resize(needed, 0);
            }
            let bytes = &mut scratch[..needed];

            let outcome = engine.pull(bytes);
            decode_into(bytes, sample_format, data);

            if outcome.finished {
                counters.record_underrun((outcome.silence / frame_bytes) as u64);
                // Full means a notice is already pending; one is enough.
                let _ = eos_tx.try_send(());
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Convert little-endian PCM bytes into device samples.
///
/// `bytes` must hold `out.len()` samples of `format`. 24-bit samples are widened to
/// the top three bytes of an `i32`.
pub(crate) fn decode_into<T>(bytes: &[u8], format: SampleFormat, out: &mut [T])
where
    T: cpal::Sample + cpal::FromSample<u8> + cpal::FromSample<i16> + cpal::FromSample<i32>,
{
    match format {
        SampleFormat::U8 => {
            for (o, b) in out.iter_mut().zip(bytes) {
                *o = <T as cpal::Sample>::from_sample::<u8>(*b);
            }
        }
        SampleFormat::S16 => {
            for (o, b) in out.iter_mut().zip(bytes.chunks_exact(2)) {
                let v = i16::from_le_bytes([b[0], b[1]]);
                *o = <T as cpal::Sample>::from_sample::<i16>(v);
            }
        }
        SampleFormat::S24 => {
            for (o, b) in out.iter_mut().zip(bytes.chunks_exact(3)) {
                let v = i32::from_le_bytes([0, b[0], b[1], b[2]]);
                *o = <T as cpal::Sample>::from_sample::<i32>(v);
            }
        }
        SampleFormat::S32 => {
            for (o, b) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                let v = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                *o = <T as cpal::Sample>::from_sample::<i32>(v);
            }
        }
    }
}
