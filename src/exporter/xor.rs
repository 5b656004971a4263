use super::Exporter;
use crate::error::{ArcError, ArcResult};
use crate::utils::xored_stream::{XoredKeyStream, XoredStream};
use std::io::Read;

/// Bytes obfuscated with a repeating XOR key, optionally followed by a
/// second codec.
#[derive(Clone, Debug)]
pub struct XorExporter {
    key: Vec<u8>,
    inner: Option<std::sync::Arc<dyn Exporter>>,
}

impl XorExporter {
    pub fn new(key: impl Into<Vec<u8>>) -> ArcResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(ArcError::Unsupported("empty XOR key".into()));
        }
        Ok(XorExporter { key, inner: None })
    }

    /// Decodes `inner` after removing the XOR layer.
    pub fn wrapping(mut self, inner: std::sync::Arc<dyn Exporter>) -> Self {
        self.inner = Some(inner);
        self
    }

    fn unmask<'a>(&self, source: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
        if self.key.len() == 1 {
            Box::new(XoredStream::new(source, self.key[0]))
        } else {
            Box::new(XoredKeyStream::new(source, self.key.clone()))
        }
    }
}

impl Exporter for XorExporter {
    fn name(&self) -> &'static str {
        "xor"
    }

    fn decoder<'a>(
        &self,
        source: Box<dyn Read + 'a>,
        compressed_len: u64,
        decompressed_len: u64,
    ) -> ArcResult<Box<dyn Read + 'a>> {
        let plain = self.unmask(source);
        match &self.inner {
            Some(inner) => inner.decoder(plain, compressed_len, decompressed_len),
            None => Ok(plain),
        }
    }

    fn can_pack(&self) -> bool {
        self.inner.as_ref().is_none_or(|i| i.can_pack())
    }

    fn pack(&self, data: &[u8]) -> ArcResult<Vec<u8>> {
        let mut packed = match &self.inner {
            Some(inner) => inner.pack(data)?,
            None => data.to_vec(),
        };
        for (i, b) in packed.iter_mut().enumerate() {
            *b ^= self.key[i % self.key.len()];
        }
        Ok(packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::ArcReader;
    use crate::exporter::zlib::ZlibExporter;
    use std::sync::Arc;

    #[test]
    fn test_single_and_multi_byte_keys() {
        for key in [vec![0x5A], vec![1, 2, 3, 4, 5]] {
            let exporter = XorExporter::new(key).unwrap();
            let packed = exporter.pack(b"obfuscated text").unwrap();
            assert_ne!(packed, b"obfuscated text");
            let mut reader = ArcReader::from_bytes(packed);
            let mut stream = exporter.open(&mut reader, 0, 15, 15).unwrap();
            assert_eq!(stream.read_to_vec().unwrap(), b"obfuscated text");
        }
        assert!(XorExporter::new(Vec::new()).is_err());
    }

    #[test]
    fn test_layered_over_zlib() {
        let exporter = XorExporter::new(vec![0xA5, 0x3C])
            .unwrap()
            .wrapping(Arc::new(ZlibExporter::default()));
        let data = b"layered layered layered layered".to_vec();
        let packed = exporter.pack(&data).unwrap();
        let mut reader = ArcReader::from_bytes(packed.clone());
        let mut stream = exporter
            .open(&mut reader, 0, packed.len() as u64, data.len() as u64)
            .unwrap();
        assert_eq!(stream.read_to_vec().unwrap(), data);
    }
}
