//! Output device discovery and selection.
//!
//! Thin wrappers around CPAL for:
//! - listing available output devices
//! - selecting either the default device or a device by substring match
//! - finding an output config that plays a file's format without resampling

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

use crate::format::FormatDescriptor;

/// Pick the first output device whose name contains `needle` (case-insensitive), or the
/// host default when `needle` is `None`.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let mut devices: Vec<cpal::Device> = host
        .output_devices()
        .context("No output devices")?
        .collect();

    if let Some(needle) = needle {
        if let Some(d) = devices.drain(..).find(|d| {
            d.description()
                .ok()
                .map(|n| matches_device_name(&n.name(), needle))
                .unwrap_or(false)
        }) {
            return Ok(d);
        }
        return Err(anyhow!("No output device matched: {needle}"));
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("No default output device"))
}

/// Find a supported output config matching the file's rate and channel count.
///
/// The device format for the file's sample layout is preferred; `f32` output is the
/// fallback when the device does not take that layout natively. Sample rates are never
/// converted, so a device without the file's rate is an error.
pub fn find_output_config(
    device: &cpal::Device,
    format: &FormatDescriptor,
) -> Result<cpal::SupportedStreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> = device
        .supported_output_configs()
        .context("query supported output configs")?
        .collect();
    if ranges.is_empty() {
        return Err(anyhow!("No supported output configs"));
    }

    let rate = format.sample_rate_hz;
    let native = format.sample_format.device_format();
    let mut fallback: Option<cpal::SupportedStreamConfig> = None;

    for range in ranges {
        if range.channels() != format.channels || !rate_in_range(&range, rate) {
            continue;
        }
        if range.sample_format() == native {
            return Ok(range.with_sample_rate(rate));
        }
        if range.sample_format() == cpal::SampleFormat::F32 && fallback.is_none() {
            fallback = Some(range.with_sample_rate(rate));
        }
    }

    fallback.ok_or_else(|| {
        anyhow!(
            "device supports no output config for {} ch @ {} Hz ({:?} or F32)",
            format.channels,
            rate,
            native
        )
    })
}

/// Choose a fixed buffer size as close to `requested_frames` as the device allows.
///
/// Returns `None` when the device only reports its default buffer size.
pub fn pick_buffer_size(
    config: &cpal::SupportedStreamConfig,
    requested_frames: u32,
) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } if min <= max => {
            Some(cpal::BufferSize::Fixed(requested_frames.clamp(*min, *max)))
        }
        cpal::SupportedBufferSize::Range { .. } => None,
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Print available output devices to stdout.
///
/// This is intended for CLI UX (`--list-devices`) rather than structured output.
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let default_name = host
        .default_output_device()
        .and_then(|d| d.description().ok())
        .map(|d| d.to_string());
    let devices = host.output_devices().context("No output devices")?;
    for (i, d) in devices.enumerate() {
        let name = d.description()?.to_string();
        let marker = if default_name.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("#{i}: {name}{marker}");
    }
    Ok(())
}

fn rate_in_range(range: &cpal::SupportedStreamConfigRange, rate: u32) -> bool {
    range.min_sample_rate() <= rate && rate <= range.max_sample_rate()
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}
