use super::Exporter;
use crate::error::ArcResult;
use std::io::Read;

/// Uncompressed bytes, passed through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stored;

impl Exporter for Stored {
    fn name(&self) -> &'static str {
        "stored"
    }

    fn decoder<'a>(
        &self,
        source: Box<dyn Read + 'a>,
        _compressed_len: u64,
        _decompressed_len: u64,
    ) -> ArcResult<Box<dyn Read + 'a>> {
        Ok(source)
    }

    fn compressed_length(
        &self,
        _reader: &mut crate::accessor::ArcReader,
        _offset: u64,
        decompressed_len: u64,
    ) -> ArcResult<u64> {
        Ok(decompressed_len)
    }

    fn can_pack(&self) -> bool {
        true
    }

    fn pack(&self, data: &[u8]) -> ArcResult<Vec<u8>> {
        Ok(data.to_vec())
    }
}
