//! PCM format model decoded from the `fmt ` chunk.

use crate::error::{Error, Result};

/// Format tag for uncompressed linear PCM.
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Concrete PCM sample layout, derived from `bits_per_sample`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    /// Unsigned 8-bit, centred on 128.
    U8,
    S16,
    /// Signed 24-bit packed into 3 bytes.
    S24,
    S32,
}

impl SampleFormat {
    /// Map a bit depth to a supported sample layout.
    pub fn from_bits(bits_per_sample: u16) -> Result<Self> {
        match bits_per_sample {
            8 => Ok(SampleFormat::U8),
            16 => Ok(SampleFormat::S16),
            24 => Ok(SampleFormat::S24),
            32 => Ok(SampleFormat::S32),
            other => Err(Error::UnsupportedBitDepth(other)),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24 => 3,
            SampleFormat::S32 => 4,
        }
    }

    /// Byte value that encodes a zero-signal sample.
    ///
    /// Every byte of a silent multi-byte signed sample is zero, so one byte value
    /// describes silence for all supported layouts.
    pub fn silence_byte(self) -> u8 {
        match self {
            SampleFormat::U8 => 0x80,
            SampleFormat::S16 | SampleFormat::S24 | SampleFormat::S32 => 0x00,
        }
    }

    /// Sample format requested from the output device.
    ///
    /// 24-bit input is widened to 32-bit on the way out.
    pub fn device_format(self) -> cpal::SampleFormat {
        match self {
            SampleFormat::U8 => cpal::SampleFormat::U8,
            SampleFormat::S16 => cpal::SampleFormat::I16,
            SampleFormat::S24 | SampleFormat::S32 => cpal::SampleFormat::I32,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SampleFormat::U8 => "PCM_U8",
            SampleFormat::S16 => "PCM_S16",
            SampleFormat::S24 => "PCM_S24",
            SampleFormat::S32 => "PCM_S32",
        }
    }
}

/// Format parameters of a loaded file. Immutable once parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub audio_format_tag: u16,
    pub channels: u16,
    pub sample_rate_hz: u32,
    /// As declared in the file; use [`FormatDescriptor::bytes_per_second`] instead.
    pub byte_rate: u32,
    /// As declared in the file; use [`FormatDescriptor::frame_bytes`] instead.
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
}

impl FormatDescriptor {
    /// Bytes per interleaved frame, recomputed from channels and bit depth.
    pub fn frame_bytes(&self) -> usize {
        usize::from(self.channels) * self.sample_format.bytes_per_sample()
    }

    /// Bytes consumed per second of playback, recomputed.
    pub fn bytes_per_second(&self) -> u64 {
        u64::from(self.sample_rate_hz)
            * u64::from(self.channels)
            * u64::from(self.bits_per_sample / 8)
    }

    /// Whether the declared `byte_rate`/`block_align` agree with the recomputed values.
    pub fn declared_rates_consistent(&self) -> bool {
        u64::from(self.byte_rate) == self.bytes_per_second()
            && usize::from(self.block_align) == self.frame_bytes()
    }

    /// Playback time of `bytes` sample bytes, in milliseconds.
    ///
    /// Fails with [`Error::ContainerInvalid`] when rate, channels or bit depth is zero.
    pub fn bytes_to_ms(&self, bytes: u64) -> Result<u64> {
        let per_second = self.bytes_per_second();
        if per_second == 0 {
            return Err(Error::ContainerInvalid(format!(
                "cannot derive duration: {} Hz, {} channels, {} bits",
                self.sample_rate_hz, self.channels, self.bits_per_sample
            )));
        }
        Ok(bytes.saturating_mul(1000) / per_second)
    }
}
