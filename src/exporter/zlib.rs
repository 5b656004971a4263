use super::{Exporter, RangeReader};
use crate::accessor::ArcReader;
use crate::error::{ArcError, ArcResult};
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::{Read, Write};

/// Deflate data, with or without the two-byte zlib header.
#[derive(Clone, Copy, Debug)]
pub struct ZlibExporter {
    level: u32,
    raw: bool,
}

impl Default for ZlibExporter {
    fn default() -> Self {
        Self::new(6)
    }
}

impl ZlibExporter {
    pub fn new(level: u32) -> Self {
        ZlibExporter {
            level: level.min(9),
            raw: false,
        }
    }

    /// Headerless deflate.
    pub fn raw(level: u32) -> Self {
        ZlibExporter {
            level: level.min(9),
            raw: true,
        }
    }

    fn measure(&self, source: &mut impl Read, decompressed_len: u64) -> ArcResult<u64> {
        let mut stream = Decompress::new(!self.raw);
        let mut input = vec![0u8; 4096];
        let mut output = vec![0u8; 16 * 1024];
        let mut in_pos = 0;
        let mut in_len = 0;
        loop {
            if in_pos == in_len {
                in_len = source.read(&mut input)?;
                in_pos = 0;
                if in_len == 0 {
                    return Err(ArcError::codec(self.name(), "stream truncated"));
                }
            }
            let before_in = stream.total_in();
            let before_out = stream.total_out();
            let status = stream
                .decompress(&input[in_pos..in_len], &mut output, FlushDecompress::None)
                .map_err(|e| ArcError::codec(self.name(), e))?;
            in_pos += (stream.total_in() - before_in) as usize;
            if stream.total_out() > decompressed_len {
                return Err(ArcError::codec(
                    self.name(),
                    format!("output exceeds declared size {}", decompressed_len),
                ));
            }
            if status == Status::StreamEnd {
                return Ok(stream.total_in());
            }
            if stream.total_in() == before_in
                && stream.total_out() == before_out
                && in_pos < in_len
            {
                return Err(ArcError::codec(self.name(), "decoder made no progress"));
            }
        }
    }
}

impl Exporter for ZlibExporter {
    fn name(&self) -> &'static str {
        if self.raw { "deflate" } else { "zlib" }
    }

    fn decoder<'a>(
        &self,
        source: Box<dyn Read + 'a>,
        _compressed_len: u64,
        _decompressed_len: u64,
    ) -> ArcResult<Box<dyn Read + 'a>> {
        Ok(if self.raw {
            Box::new(flate2::read::DeflateDecoder::new(source))
        } else {
            Box::new(flate2::read::ZlibDecoder::new(source))
        })
    }

    fn compressed_length(
        &self,
        reader: &mut ArcReader,
        offset: u64,
        decompressed_len: u64,
    ) -> ArcResult<u64> {
        let saved = reader.position();
        let result = {
            let mut range = RangeReader::to_end(reader, offset)?;
            self.measure(&mut range, decompressed_len)
        };
        reader.seek(saved)?;
        result
    }

    fn can_pack(&self) -> bool {
        true
    }

    fn pack(&self, data: &[u8]) -> ArcResult<Vec<u8>> {
        let level = Compression::new(self.level);
        if self.raw {
            let mut e = flate2::write::DeflateEncoder::new(Vec::new(), level);
            e.write_all(data)?;
            Ok(e.finish()?)
        } else {
            let mut e = flate2::write::ZlibEncoder::new(Vec::new(), level);
            e.write_all(data)?;
            Ok(e.finish()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..20_000u32).map(|i| (i % 251) as u8 ^ (i / 97) as u8).collect()
    }

    #[test]
    fn test_streaming_matches_whole_buffer() {
        let data = sample();
        let packed = ZlibExporter::new(9).pack(&data).unwrap();
        let mut whole = Vec::new();
        flate2::read::ZlibDecoder::new(&packed[..])
            .read_to_end(&mut whole)
            .unwrap();

        let mut archive = vec![0xEEu8; 7];
        archive.extend_from_slice(&packed);
        let mut reader = ArcReader::from_bytes(archive);
        let mut stream = ZlibExporter::default()
            .open(&mut reader, 7, packed.len() as u64, data.len() as u64)
            .unwrap();
        let mut streamed = Vec::new();
        let mut chunk = [0u8; 333];
        loop {
            let n = stream.read_up_to(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            streamed.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(streamed, whole);
        assert_eq!(streamed, data);
    }

    #[test]
    fn test_compressed_length_of_unframed_stream() {
        let data = sample();
        let exporter = ZlibExporter::new(6);
        let packed = exporter.pack(&data).unwrap();
        let mut archive = packed.clone();
        archive.extend_from_slice(b"trailing entry data");
        let mut reader = ArcReader::from_bytes(archive);
        reader.seek(3).unwrap();
        let measured = exporter
            .compressed_length(&mut reader, 0, data.len() as u64)
            .unwrap();
        assert_eq!(measured, packed.len() as u64);
        assert_eq!(reader.position(), 3);
        assert!(exporter.compressed_length(&mut reader, 0, 10).is_err());
    }

    #[test]
    fn test_raw_deflate_round_trip() {
        let exporter = ZlibExporter::raw(6);
        let packed = exporter.pack(b"raw deflate payload").unwrap();
        let mut reader = ArcReader::from_bytes(packed.clone());
        let mut stream = exporter.open(&mut reader, 0, packed.len() as u64, 19).unwrap();
        assert_eq!(stream.read_to_vec().unwrap(), b"raw deflate payload");
    }

    #[test]
    fn test_corrupt_stream_is_codec_error() {
        let mut reader = ArcReader::from_bytes(vec![0x78, 0x9c, 0xFF, 0xFF, 0xFF, 0xFF]);
        let mut stream = ZlibExporter::default().open(&mut reader, 0, 6, 100).unwrap();
        assert!(matches!(stream.read_to_vec(), Err(ArcError::Codec { .. })));
    }
}
