//! RIFF/WAVE container parser.
//!
//! Locates the `fmt ` and `data` chunks in any order relative to unknown chunks,
//! decodes the PCM format and returns the raw little-endian sample bytes untouched.
//! The parse is one synchronous pass; on failure nothing is retained.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::format::{FormatDescriptor, SampleFormat, WAVE_FORMAT_PCM};
use crate::riff::{ChunkAlignment, ChunkHeader, ChunkReader, FourCc};

/// Minimum size of a PCM `fmt ` payload.
const FMT_MIN_LEN: u32 = 16;

/// How the declared RIFF group size is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RiffSizePolicy {
    /// Chunks extending past the declared RIFF size are logged and accepted.
    #[default]
    Advisory,
    /// Chunks extending past the declared RIFF size fail the parse.
    Strict,
}

/// Parser knobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub alignment: ChunkAlignment,
    pub riff_size: RiffSizePolicy,
}

/// Raw sample bytes of a loaded file, shared read-only with the audio callback.
#[derive(Clone, Debug)]
pub struct SampleBuffer(Arc<[u8]>);

impl SampleBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of one successful parse: format and samples, created and dropped together.
#[derive(Clone, Debug)]
pub struct WavFile {
    pub format: FormatDescriptor,
    pub samples: SampleBuffer,
}

impl WavFile {
    /// Parse an in-memory container.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, opts: &ParseOptions) -> Result<Self> {
        parse_wav(Cursor::new(bytes.into()), opts)
    }

    /// Size of the `data` payload in bytes.
    pub fn data_size(&self) -> u32 {
        self.samples.len() as u32
    }

    /// Total playback time in milliseconds.
    pub fn duration_ms(&self) -> Result<u64> {
        self.format.bytes_to_ms(u64::from(self.data_size()))
    }
}

/// Open `path` and parse it.
pub fn open_wav(path: &Path, opts: &ParseOptions) -> Result<WavFile> {
    open_wav_with(path, opts, |_, _| {})
}

/// Open `path` and parse it, reporting the header through `on_header` as in
/// [`parse_wav_with`].
pub fn open_wav_with(
    path: &Path,
    opts: &ParseOptions,
    on_header: impl FnOnce(&FmtFields, u32),
) -> Result<WavFile> {
    let file = File::open(path).map_err(|source| Error::FileInaccessible {
        path: path.to_path_buf(),
        source,
    })?;
    let wav = parse_wav_with(BufReader::new(file), opts, on_header)?;
    tracing::info!(path = %path.display(), "loaded wav file");
    Ok(wav)
}

/// Parse a RIFF/WAVE stream positioned at its first byte.
pub fn parse_wav<R: Read + Seek>(source: R, opts: &ParseOptions) -> Result<WavFile> {
    parse_wav_with(source, opts, |_, _| {})
}

/// Parse a RIFF/WAVE stream, calling `on_header` with the stored `fmt ` fields and the
/// declared `data` size once both chunks are found.
///
/// The callback runs before the sample bytes are read and before the format is
/// validated, so it also sees files that are then rejected as non-PCM or for their bit
/// depth.
pub fn parse_wav_with<R: Read + Seek>(
    source: R,
    opts: &ParseOptions,
    on_header: impl FnOnce(&FmtFields, u32),
) -> Result<WavFile> {
    let mut reader = ChunkReader::new(source).map_err(|e| invalid("cannot inspect source", e))?;

    let riff_end = read_riff_header(&mut reader)?;
    let bounds = RiffBounds {
        end: riff_end,
        policy: opts.riff_size,
    };

    let fmt_header =
        find_chunk(&mut reader, FourCc::FMT, opts.alignment, &bounds)?.ok_or(Error::FormatChunkMissing)?;
    let raw = read_fmt_fields(&mut reader, &fmt_header)?;
    if reader.skip_payload(&fmt_header, opts.alignment).is_err() {
        // The extension runs off the end of the stream; nothing can follow it.
        return Err(Error::DataChunkMissing);
    }

    let data_header =
        find_chunk(&mut reader, FourCc::DATA, opts.alignment, &bounds)?.ok_or(Error::DataChunkMissing)?;
    on_header(&raw, data_header.size);
    let bytes = reader
        .read_payload(data_header.size)
        .map_err(|e| invalid("read error in data chunk", e))?;
    if bytes.len() < data_header.size as usize {
        return Err(Error::TruncatedData {
            declared: data_header.size,
            available: bytes.len() as u64,
        });
    }

    let format = validate(raw)?;
    tracing::info!(
        channels = format.channels,
        sample_rate_hz = format.sample_rate_hz,
        bits_per_sample = format.bits_per_sample,
        audio_format = format.audio_format_tag,
        data_size = data_header.size,
        "wav file information"
    );
    if !format.declared_rates_consistent() {
        tracing::warn!(
            byte_rate = format.byte_rate,
            block_align = format.block_align,
            expected_byte_rate = format.bytes_per_second(),
            expected_block_align = format.frame_bytes(),
            "declared byte rate / block align disagree with format; using recomputed values"
        );
    }

    Ok(WavFile {
        format,
        samples: SampleBuffer::new(bytes),
    })
}

/// `fmt ` fields exactly as stored, before validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FmtFields {
    pub audio_format_tag: u16,
    pub channels: u16,
    pub sample_rate_hz: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

struct RiffBounds {
    end: u64,
    policy: RiffSizePolicy,
}

impl RiffBounds {
    fn check(&self, header: &ChunkHeader) -> Result<()> {
        let chunk_end = header.payload_offset + u64::from(header.size);
        if chunk_end <= self.end {
            return Ok(());
        }
        match self.policy {
            RiffSizePolicy::Advisory => {
                tracing::warn!(
                    chunk = %header.id,
                    chunk_end,
                    riff_end = self.end,
                    "chunk extends past declared RIFF size"
                );
                Ok(())
            }
            RiffSizePolicy::Strict => Err(Error::ContainerInvalid(format!(
                "chunk '{}' ends at byte {chunk_end}, past declared RIFF end {}",
                header.id, self.end
            ))),
        }
    }
}

fn invalid(what: &str, err: io::Error) -> Error {
    Error::ContainerInvalid(format!("{what}: {err}"))
}

/// Validate the 12-byte RIFF header and return the declared end of the RIFF group.
fn read_riff_header<R: Read + Seek>(reader: &mut ChunkReader<R>) -> Result<u64> {
    if reader.is_empty() {
        return Err(Error::ContainerInvalid("file is empty".into()));
    }
    let group = reader
        .read_fourcc()
        .map_err(|e| invalid("RIFF header inaccessible", e))?;
    let size = reader
        .read_u32_le()
        .map_err(|e| invalid("RIFF header inaccessible", e))?;
    let form = reader
        .read_fourcc()
        .map_err(|e| invalid("failed to read form type", e))?;

    if group != FourCc::RIFF {
        return Err(Error::ContainerInvalid(format!("expected 'RIFF', found '{group}'")));
    }
    if form != FourCc::WAVE {
        return Err(Error::ContainerInvalid(format!("expected 'WAVE', found '{form}'")));
    }
    if u64::from(size) + ChunkHeader::LEN != reader.len() {
        tracing::debug!(
            declared = size,
            stream_len = reader.len(),
            "RIFF size does not match stream length"
        );
    }
    Ok(u64::from(size) + ChunkHeader::LEN)
}

/// Scan forward to the next chunk called `id`, skipping everything else.
///
/// Returns `Ok(None)` if the stream runs out first, including when an unknown chunk
/// claims more bytes than remain.
fn find_chunk<R: Read + Seek>(
    reader: &mut ChunkReader<R>,
    id: FourCc,
    alignment: ChunkAlignment,
    bounds: &RiffBounds,
) -> Result<Option<ChunkHeader>> {
    loop {
        let header = match reader.read_chunk_header() {
            Ok(Some(h)) => h,
            Ok(None) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(invalid("read error while scanning chunks", e)),
        };
        bounds.check(&header)?;
        if header.id == id {
            return Ok(Some(header));
        }
        tracing::debug!(
            chunk = %header.id,
            size = header.size,
            offset = reader.position(),
            "skipping chunk"
        );
        match reader.skip_payload(&header, alignment) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(invalid("read error while skipping chunk", e)),
        }
    }
}

fn read_fmt_fields<R: Read + Seek>(reader: &mut ChunkReader<R>, header: &ChunkHeader) -> Result<FmtFields> {
    if header.size < FMT_MIN_LEN {
        return Err(Error::ContainerInvalid(format!(
            "format chunk is {} bytes, expected at least {FMT_MIN_LEN}",
            header.size
        )));
    }
    let read = |reader: &mut ChunkReader<R>| -> io::Result<FmtFields> {
        Ok(FmtFields {
            audio_format_tag: reader.read_u16_le()?,
            channels: reader.read_u16_le()?,
            sample_rate_hz: reader.read_u32_le()?,
            byte_rate: reader.read_u32_le()?,
            block_align: reader.read_u16_le()?,
            bits_per_sample: reader.read_u16_le()?,
        })
    };
    read(reader).map_err(|e| invalid("format chunk truncated", e))
}

fn validate(raw: FmtFields) -> Result<FormatDescriptor> {
    if raw.audio_format_tag != WAVE_FORMAT_PCM {
        return Err(Error::UnsupportedCodec(raw.audio_format_tag));
    }
    let sample_format = SampleFormat::from_bits(raw.bits_per_sample)?;
    if raw.channels == 0 {
        return Err(Error::ContainerInvalid("channel count is zero".into()));
    }
    if raw.sample_rate_hz == 0 {
        return Err(Error::ContainerInvalid("sample rate is zero".into()));
    }
    Ok(FormatDescriptor {
        audio_format_tag: raw.audio_format_tag,
        channels: raw.channels,
        sample_rate_hz: raw.sample_rate_hz,
        byte_rate: raw.byte_rate,
        block_align: raw.block_align,
        bits_per_sample: raw.bits_per_sample,
        sample_format,
    })
}
