//! RIFF chunk primitives.
//!
//! A RIFF stream is a sequence of `(id: [u8; 4], size: u32 LE, payload)` chunks.
//! [`ChunkReader`] walks those headers over any `Read + Seek` source (file, memory
//! buffer, spooled network stream) so the WAV parser never touches the medium directly.
//!
//! Short reads are reported as [`io::ErrorKind::UnexpectedEof`]; the parser decides
//! which error kind that maps to in each context.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// Four-character chunk identifier, compared byte-for-byte (no case folding).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: FourCc = FourCc(*b"RIFF");
    pub const WAVE: FourCc = FourCc(*b"WAVE");
    pub const FMT: FourCc = FourCc(*b"fmt ");
    pub const DATA: FourCc = FourCc(*b"data");
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// How odd-sized chunk payloads are laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkAlignment {
    /// RIFF rule: an odd-sized payload is followed by one pad byte.
    #[default]
    Padded,
    /// No pad byte; the next header starts right after the payload.
    Packed,
}

impl ChunkAlignment {
    /// Bytes occupied by a payload of `size` bytes, including the pad byte.
    pub fn padded_len(self, size: u32) -> u64 {
        let size = u64::from(size);
        match self {
            ChunkAlignment::Padded => size + (size & 1),
            ChunkAlignment::Packed => size,
        }
    }
}

/// Chunk identifier and declared payload size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: FourCc,
    pub size: u32,
    /// Stream offset of the first payload byte.
    pub payload_offset: u64,
}

impl ChunkHeader {
    pub const LEN: u64 = 8;
}

/// Decode a little-endian `u16`.
pub fn le_u16(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Decode a little-endian `u32`.
pub fn le_u32(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Sequential chunk reader over a seekable byte source.
pub struct ChunkReader<R> {
    inner: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Wrap `inner`, which must be positioned at the start of the RIFF stream.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let pos = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;
        Ok(Self { inner, pos, len })
    }

    /// Current offset from the start of the stream.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Total stream length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left between the cursor and the end of the stream.
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.pos += N as u64;
        Ok(buf)
    }

    pub fn read_fourcc(&mut self) -> io::Result<FourCc> {
        self.read_array::<4>().map(FourCc)
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        self.read_array::<2>().map(le_u16)
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.read_array::<4>().map(le_u32)
    }

    /// Read the next chunk header.
    ///
    /// Returns `Ok(None)` when fewer than 8 bytes remain, i.e. the chunk list is exhausted.
    pub fn read_chunk_header(&mut self) -> io::Result<Option<ChunkHeader>> {
        if self.remaining() < ChunkHeader::LEN {
            return Ok(None);
        }
        let id = self.read_fourcc()?;
        let size = self.read_u32_le()?;
        Ok(Some(ChunkHeader {
            id,
            size,
            payload_offset: self.pos,
        }))
    }

    /// Seek forward by `n` bytes. Fails if that would move past the end of the stream.
    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        if n > self.remaining() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("skip of {n} bytes past end of stream at offset {}", self.pos),
            ));
        }
        let target = self.pos + n;
        self.inner.seek(SeekFrom::Start(target))?;
        self.pos = target;
        Ok(())
    }

    /// Move past whatever is left of `header`'s payload, honouring `alignment`.
    ///
    /// A pad byte missing at the very end of the stream is tolerated.
    pub fn skip_payload(&mut self, header: &ChunkHeader, alignment: ChunkAlignment) -> io::Result<()> {
        let end = header.payload_offset + alignment.padded_len(header.size);
        let end = if end == self.len + 1 && alignment == ChunkAlignment::Padded {
            self.len
        } else {
            end
        };
        let n = end.checked_sub(self.pos).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("cursor {} already past end of chunk {}", self.pos, header.id),
            )
        })?;
        self.skip(n)
    }

    /// Read up to `len` bytes of payload.
    ///
    /// The declared length is not trusted for the allocation: the returned buffer only
    /// grows as bytes actually arrive, so the caller can compare its length to `len`.
    pub fn read_payload(&mut self, len: u32) -> io::Result<Vec<u8>> {
        let cap = u64::from(len).min(self.remaining()) as usize;
        let mut out = Vec::with_capacity(cap);
        (&mut self.inner).take(u64::from(len)).read_to_end(&mut out)?;
        self.pos += out.len() as u64;
        Ok(out)
    }
}
