//! Okumura-style LZSS: a 4 KiB ring buffer, flag bytes read LSB first,
//! a set bit for a literal and a clear bit for a 12-bit position with a
//! 4-bit length.
use super::{Exporter, RangeReader};
use crate::accessor::ArcReader;
use crate::error::{ArcError, ArcResult};
use std::io::Read;

const RING_SIZE: usize = 0x1000;
const RING_MASK: usize = RING_SIZE - 1;
const RING_START: usize = 0xFEE;
const MIN_MATCH: usize = 3;

#[derive(Clone, Copy, Debug, Default)]
pub struct LzssExporter;

/// Streaming decoder that counts the stored bytes it consumes.
pub struct LzssDecoder<R> {
    source: R,
    ring: Box<[u8; RING_SIZE]>,
    ring_pos: usize,
    flags: u16,
    match_pos: usize,
    match_left: usize,
    consumed: u64,
    finished: bool,
}

impl<R: Read> LzssDecoder<R> {
    pub fn new(source: R) -> Self {
        LzssDecoder {
            source,
            ring: Box::new([0u8; RING_SIZE]),
            ring_pos: RING_START,
            flags: 0,
            match_pos: 0,
            match_left: 0,
            consumed: 0,
            finished: false,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn next_input(&mut self) -> std::io::Result<Option<u8>> {
        let mut b = [0u8; 1];
        loop {
            match self.source.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.consumed += 1;
                    return Ok(Some(b[0]));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn push(&mut self, b: u8) -> u8 {
        self.ring[self.ring_pos] = b;
        self.ring_pos = (self.ring_pos + 1) & RING_MASK;
        b
    }

    /// Produces one output byte, or `None` once the source runs dry.
    fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
        if self.match_left > 0 {
            let b = self.ring[self.match_pos];
            self.match_pos = (self.match_pos + 1) & RING_MASK;
            self.match_left -= 1;
            return Ok(Some(self.push(b)));
        }
        if self.finished {
            return Ok(None);
        }
        self.flags >>= 1;
        if self.flags & 0x100 == 0 {
            match self.next_input()? {
                Some(f) => self.flags = f as u16 | 0xFF00,
                None => {
                    self.finished = true;
                    return Ok(None);
                }
            }
        }
        if self.flags & 1 != 0 {
            return match self.next_input()? {
                Some(b) => Ok(Some(self.push(b))),
                None => {
                    self.finished = true;
                    Ok(None)
                }
            };
        }
        let (lo, hi) = match (self.next_input()?, self.next_input()?) {
            (Some(lo), Some(hi)) => (lo as usize, hi as usize),
            _ => {
                self.finished = true;
                return Ok(None);
            }
        };
        self.match_pos = lo | ((hi & 0xF0) << 4);
        self.match_left = (hi & 0x0F) + MIN_MATCH;
        self.next_byte()
    }
}

impl<R: Read> Read for LzssDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.next_byte()? {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Exporter for LzssExporter {
    fn name(&self) -> &'static str {
        "lzss"
    }

    fn decoder<'a>(
        &self,
        source: Box<dyn Read + 'a>,
        _compressed_len: u64,
        _decompressed_len: u64,
    ) -> ArcResult<Box<dyn Read + 'a>> {
        Ok(Box::new(LzssDecoder::new(source)))
    }

    fn compressed_length(
        &self,
        reader: &mut ArcReader,
        offset: u64,
        decompressed_len: u64,
    ) -> ArcResult<u64> {
        let saved = reader.position();
        let result = (|| -> ArcResult<u64> {
            let range = RangeReader::to_end(reader, offset)?;
            let mut decoder = LzssDecoder::new(range);
            let mut limited = (&mut decoder).take(decompressed_len);
            let produced = std::io::copy(&mut limited, &mut std::io::sink())?;
            if produced < decompressed_len {
                return Err(ArcError::codec(
                    "lzss",
                    format!("stream ended after {} of {} bytes", produced, decompressed_len),
                ));
            }
            Ok(decoder.consumed())
        })();
        reader.seek(saved)?;
        result
    }

    fn can_pack(&self) -> bool {
        true
    }

    /// Emits literal runs only, which every LZSS decoder accepts.
    fn pack(&self, data: &[u8]) -> ArcResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() + data.len().div_ceil(8));
        for chunk in data.chunks(8) {
            out.push((1u16 << chunk.len()).wrapping_sub(1) as u8);
            out.extend_from_slice(chunk);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "ABC" as literals, then a back-reference of 6 bytes to the ring start.
    const ABC_STREAM: [u8; 6] = [0x07, b'A', b'B', b'C', 0xEE, 0xF3];

    #[test]
    fn test_back_reference() {
        let mut out = Vec::new();
        LzssDecoder::new(&ABC_STREAM[..]).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"ABCABCABC");
    }

    #[test]
    fn test_initial_ring_is_zeroed() {
        // A single match against untouched ring space.
        let stream = [0x00, 0x00, 0x00];
        let mut out = Vec::new();
        LzssDecoder::new(&stream[..]).read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![0u8; 3]);
    }

    #[test]
    fn test_compressed_length_without_stored_size() {
        let mut archive = ABC_STREAM.to_vec();
        archive.extend_from_slice(b"next");
        let mut reader = ArcReader::from_bytes(archive);
        assert_eq!(LzssExporter.compressed_length(&mut reader, 0, 9).unwrap(), 6);
        assert_eq!(LzssExporter.compressed_length(&mut reader, 0, 3).unwrap(), 4);
        assert_eq!(reader.position(), 0);
        let mut reader = ArcReader::from_bytes(ABC_STREAM.to_vec());
        assert!(LzssExporter.compressed_length(&mut reader, 0, 10).is_err());
    }

    #[test]
    fn test_pack_round_trip() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();
        let packed = LzssExporter.pack(&data).unwrap();
        let mut reader = ArcReader::from_bytes(packed.clone());
        let mut stream = LzssExporter
            .open(&mut reader, 0, packed.len() as u64, data.len() as u64)
            .unwrap();
        assert_eq!(stream.read_to_vec().unwrap(), data);
        let mut reader = ArcReader::from_bytes(packed.clone());
        assert_eq!(
            LzssExporter
                .compressed_length(&mut reader, 0, data.len() as u64)
                .unwrap(),
            packed.len() as u64
        );
    }
}
