//! In-memory WAV construction for tests.

/// Builds RIFF/WAVE byte streams, including deliberately malformed ones.
#[derive(Clone, Debug)]
pub(crate) struct WavBuilder {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    bits: u16,
    fmt_extension: Vec<u8>,
    before_fmt: Vec<([u8; 4], Vec<u8>)>,
    before_data: Vec<([u8; 4], Vec<u8>)>,
    data: Option<Vec<u8>>,
    declared_data_size: Option<u32>,
    declared_riff_size: Option<u32>,
    pad: bool,
}

impl WavBuilder {
    pub(crate) fn pcm(channels: u16, sample_rate: u32, bits: u16) -> Self {
        Self {
            format_tag: 1,
            channels,
            sample_rate,
            bits,
            fmt_extension: Vec::new(),
            before_fmt: Vec::new(),
            before_data: Vec::new(),
            data: Some(Vec::new()),
            declared_data_size: None,
            declared_riff_size: None,
            pad: true,
        }
    }

    pub(crate) fn format_tag(mut self, tag: u16) -> Self {
        self.format_tag = tag;
        self
    }

    pub(crate) fn fmt_extension(mut self, bytes: Vec<u8>) -> Self {
        self.fmt_extension = bytes;
        self
    }

    pub(crate) fn chunk_before_fmt(mut self, id: [u8; 4], payload: Vec<u8>) -> Self {
        self.before_fmt.push((id, payload));
        self
    }

    pub(crate) fn chunk_before_data(mut self, id: [u8; 4], payload: Vec<u8>) -> Self {
        self.before_data.push((id, payload));
        self
    }

    pub(crate) fn data(mut self, bytes: Vec<u8>) -> Self {
        self.data = Some(bytes);
        self
    }

    pub(crate) fn without_data(mut self) -> Self {
        self.data = None;
        self
    }

    pub(crate) fn declared_data_size(mut self, size: u32) -> Self {
        self.declared_data_size = Some(size);
        self
    }

    pub(crate) fn declared_riff_size(mut self, size: u32) -> Self {
        self.declared_riff_size = Some(size);
        self
    }

    /// Omit pad bytes after odd-sized chunks.
    pub(crate) fn packed(mut self) -> Self {
        self.pad = false;
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(b"WAVE");

        for (id, payload) in &self.before_fmt {
            self.push_chunk(&mut out, id, payload.len() as u32, payload);
        }

        let frame = u32::from(self.channels) * u32::from(self.bits) / 8;
        let mut fmt = Vec::with_capacity(16 + self.fmt_extension.len());
        fmt.extend_from_slice(&self.format_tag.to_le_bytes());
        fmt.extend_from_slice(&self.channels.to_le_bytes());
        fmt.extend_from_slice(&self.sample_rate.to_le_bytes());
        fmt.extend_from_slice(&(self.sample_rate * frame).to_le_bytes());
        fmt.extend_from_slice(&(frame as u16).to_le_bytes());
        fmt.extend_from_slice(&self.bits.to_le_bytes());
        fmt.extend_from_slice(&self.fmt_extension);
        self.push_chunk(&mut out, b"fmt ", fmt.len() as u32, &fmt);

        for (id, payload) in &self.before_data {
            self.push_chunk(&mut out, id, payload.len() as u32, payload);
        }

        if let Some(data) = &self.data {
            let declared = self.declared_data_size.unwrap_or(data.len() as u32);
            self.push_chunk(&mut out, b"data", declared, data);
        }

        let riff_size = self
            .declared_riff_size
            .unwrap_or((out.len() - 8) as u32);
        out[4..8].copy_from_slice(&riff_size.to_le_bytes());
        out
    }

    fn push_chunk(&self, out: &mut Vec<u8>, id: &[u8; 4], declared: u32, payload: &[u8]) {
        out.extend_from_slice(id);
        out.extend_from_slice(&declared.to_le_bytes());
        out.extend_from_slice(payload);
        if self.pad && payload.len() % 2 == 1 {
            out.push(0);
        }
    }
}
