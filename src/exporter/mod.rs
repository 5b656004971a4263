//! Streaming decompression of resource byte ranges.
//!
//! An [`Exporter`] turns a stored byte range into a [`ExportStream`] of the
//! resource's logical bytes, decoding lazily as the caller pulls data.
pub mod blocks;
pub mod lzss;
pub mod stored;
pub mod xor;
pub mod zlib;

use crate::accessor::ArcReader;
use crate::error::{ArcError, ArcResult};
use std::io::Read;

const STREAM_BUFFER_SIZE: usize = 4096;

pub trait Exporter: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Wraps a source positioned at the first stored byte in a decoder.
    fn decoder<'a>(
        &self,
        source: Box<dyn Read + 'a>,
        compressed_len: u64,
        decompressed_len: u64,
    ) -> ArcResult<Box<dyn Read + 'a>>;

    fn open<'a>(
        &self,
        reader: &'a mut ArcReader,
        offset: u64,
        compressed_len: u64,
        decompressed_len: u64,
    ) -> ArcResult<ExportStream<'a>> {
        let source = RangeReader::new(reader, offset, compressed_len)?;
        let decoder = self.decoder(Box::new(source), compressed_len, decompressed_len)?;
        Ok(ExportStream::new(self.name(), decoder, decompressed_len))
    }

    /// Decodes forward from `offset` until `decompressed_len` bytes are
    /// produced and returns the number of stored bytes consumed. Used by
    /// formats that record only the decompressed size.
    fn compressed_length(
        &self,
        _reader: &mut ArcReader,
        _offset: u64,
        _decompressed_len: u64,
    ) -> ArcResult<u64> {
        Err(ArcError::Unsupported(format!(
            "measuring compressed length with {}",
            self.name()
        )))
    }

    fn can_pack(&self) -> bool {
        false
    }

    /// Encodes logical bytes for a rebuild.
    fn pack(&self, _data: &[u8]) -> ArcResult<Vec<u8>> {
        Err(ArcError::Unsupported(format!("packing with {}", self.name())))
    }
}

/// A bounded view of `[offset, offset + len)` in a reader.
#[derive(Debug)]
pub struct RangeReader<'a> {
    reader: &'a mut ArcReader,
    end: u64,
    start: u64,
}

impl<'a> RangeReader<'a> {
    pub fn new(reader: &'a mut ArcReader, offset: u64, len: u64) -> ArcResult<Self> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= reader.len())
            .ok_or(ArcError::OutOfBounds {
                pos: offset,
                len,
                size: reader.len(),
            })?;
        reader.seek(offset)?;
        Ok(RangeReader {
            reader,
            end,
            start: offset,
        })
    }

    /// A view from `offset` to the end of the source.
    pub fn to_end(reader: &'a mut ArcReader, offset: u64) -> ArcResult<Self> {
        let len = reader.len().saturating_sub(offset);
        Self::new(reader, offset, len)
    }

    pub fn consumed(&self) -> u64 {
        self.reader.position() - self.start
    }
}

impl Read for RangeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let left = self.end - self.reader.position();
        let n = (buf.len() as u64).min(left) as usize;
        self.reader.fill(&mut buf[..n])?;
        Ok(n)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Closed,
    Open,
    Streaming,
    Exhausted,
}

/// The decompressed bytes of one resource, produced on demand.
pub struct ExportStream<'a> {
    codec: &'static str,
    decoder: Option<Box<dyn Read + 'a>>,
    state: StreamState,
    total: u64,
    produced: u64,
    buf: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
}

impl std::fmt::Debug for ExportStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportStream")
            .field("codec", &self.codec)
            .field("state", &self.state)
            .field("total", &self.total)
            .field("produced", &self.produced)
            .finish_non_exhaustive()
    }
}

impl<'a> ExportStream<'a> {
    pub fn new(codec: &'static str, decoder: Box<dyn Read + 'a>, total: u64) -> Self {
        ExportStream {
            codec,
            decoder: Some(decoder),
            state: StreamState::Open,
            total,
            produced: 0,
            buf: Vec::new(),
            buf_pos: 0,
            buf_len: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether more decompressed bytes remain.
    pub fn available(&self) -> bool {
        self.state != StreamState::Closed
            && (self.buf_pos < self.buf_len || self.produced < self.total)
    }

    pub fn close(&mut self) {
        self.decoder = None;
        self.buf = Vec::new();
        self.buf_pos = 0;
        self.buf_len = 0;
        self.state = StreamState::Closed;
    }

    /// Pulls bytes straight from the decoder, never past `total`.
    fn pull(&mut self, out: &mut [u8]) -> ArcResult<usize> {
        let decoder = match self.decoder.as_mut() {
            Some(d) => d,
            None => return Err(ArcError::codec(self.codec, "stream is closed")),
        };
        let want = (out.len() as u64).min(self.total - self.produced) as usize;
        if want == 0 {
            self.state = StreamState::Exhausted;
            return Ok(0);
        }
        let n = loop {
            match decoder.read(&mut out[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ArcError::codec(self.codec, e)),
            }
        };
        if n == 0 {
            return Err(ArcError::codec(
                self.codec,
                format!(
                    "stream ended after {} of {} bytes",
                    self.produced, self.total
                ),
            ));
        }
        self.produced += n as u64;
        self.state = if self.produced == self.total {
            StreamState::Exhausted
        } else {
            StreamState::Streaming
        };
        Ok(n)
    }

    pub fn read_byte(&mut self) -> ArcResult<Option<u8>> {
        if self.buf_pos == self.buf_len {
            if self.buf.len() < STREAM_BUFFER_SIZE {
                self.buf.resize(STREAM_BUFFER_SIZE, 0);
            }
            let mut buf = std::mem::take(&mut self.buf);
            let n = self.pull(&mut buf);
            self.buf = buf;
            self.buf_pos = 0;
            self.buf_len = n?;
            if self.buf_len == 0 {
                return Ok(None);
            }
        }
        let b = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Ok(Some(b))
    }

    /// Reads until `out` is full or the stream is exhausted.
    pub fn read_up_to(&mut self, out: &mut [u8]) -> ArcResult<usize> {
        let mut done = 0;
        while done < out.len() {
            let n = self.read_some(&mut out[done..])?;
            if n == 0 {
                break;
            }
            done += n;
        }
        Ok(done)
    }

    pub fn read_to_vec(&mut self) -> ArcResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.total.min(1 << 24) as usize);
        let mut chunk = vec![0u8; STREAM_BUFFER_SIZE];
        loop {
            let n = self.read_some(&mut chunk)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }

    fn read_some(&mut self, out: &mut [u8]) -> ArcResult<usize> {
        if self.buf_pos < self.buf_len {
            let n = (self.buf_len - self.buf_pos).min(out.len());
            out[..n].copy_from_slice(&self.buf[self.buf_pos..self.buf_pos + n]);
            self.buf_pos += n;
            return Ok(n);
        }
        if self.state == StreamState::Exhausted {
            return Ok(0);
        }
        self.pull(out)
    }
}

impl Read for ExportStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_some(buf)?)
    }
}
