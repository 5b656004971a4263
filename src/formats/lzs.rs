//! LZSS archive that stores only decompressed sizes.
//!
//! ```text
//! "LZS\x1a"  u16 numFiles
//! numFiles * { cstring name (<= 64), u32 offset, u32 decompressedLength }
//! LZSS data
//! ```
//! Compressed lengths are discovered by decoding each entry once.
use super::base::*;
use super::sniff::Rating;
use crate::accessor::ArcReader;
use crate::archive::ArchiveSession;
use crate::error::ArcResult;
use crate::exporter::Exporter;
use crate::exporter::lzss::LzssExporter;
use crate::guards::*;
use crate::resource::Resource;
use crate::types::*;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub const MAGIC: &[u8; 4] = b"LZS\x1a";
pub const MAX_NAME: u64 = 64;

#[derive(Debug)]
pub struct LzsDescriptor {}

impl LzsDescriptor {
    pub const fn new() -> Self {
        LzsDescriptor {}
    }
}

impl FormatDescriptor for LzsDescriptor {
    fn format(&self) -> &'static ArchiveFormat {
        &ArchiveFormat::Lzs
    }

    fn name(&self) -> &'static str {
        "LZSS archive"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["lzs"]
    }

    fn platforms(&self) -> &'static [Platform] {
        &[Platform::Ps2, Platform::Psp]
    }

    fn default_encoding(&self) -> Encoding {
        Encoding::Cp932
    }

    fn rate(&self, path: &Path, reader: &mut ArcReader) -> ArcResult<u32> {
        let mut rating = Rating::new();
        rating.extension(path, self.extensions());
        let magic = reader.read_bytes(MAGIC.len() as u64)?;
        if !rating.magic(&magic, MAGIC) {
            return Ok(rating.score());
        }
        let num_files = reader.read_u16_le()?;
        rating.corroborate(check_num_files(num_files as i64));
        if num_files > 0 {
            let name = reader.read_cstring(MAX_NAME, Encoding::Cp932)?;
            rating.corroborate(check_filename(&name));
            let offset = reader.read_u32_le()?;
            rating.corroborate(check_offset(offset as i64, reader.len()));
        }
        Ok(rating.score())
    }

    fn read(&self, session: &ArchiveSession, reader: &mut ArcReader) -> Result<Vec<Resource>> {
        reader.set_endian(Endian::Little);
        reader.seek(0)?;
        let magic = reader.read_bytes(MAGIC.len() as u64)?;
        ensure_equals("magic", magic.as_slice(), MAGIC.as_slice())?;
        let num_files = ensure_num_files(reader.read_u16()? as i64, session.max_files())?;
        let encoding = session.encoding(self.default_encoding());
        let size = reader.len();

        let mut entries = Vec::with_capacity(num_files as usize);
        for _ in 0..num_files {
            let name = reader.read_cstring(MAX_NAME, encoding)?;
            ensure_filename(&name)?;
            let offset = ensure_offset(reader.read_u32()? as i64, size)?;
            let decompressed = ensure_length(reader.read_u32()? as i64, None)?;
            entries.push((name, offset, decompressed));
        }

        let lzss: Arc<dyn Exporter> = Arc::new(LzssExporter);
        let mut resources = Vec::with_capacity(entries.len());
        for (name, offset, decompressed) in entries {
            let length = match lzss.compressed_length(reader, offset, decompressed) {
                Ok(len) => len,
                Err(e) => {
                    tracing::warn!(
                        "Cannot measure {} at {:#x}, assuming it runs to the end: {}",
                        name,
                        offset,
                        e
                    );
                    size - offset
                }
            };
            resources.push(Resource::compressed(
                name,
                session.path(),
                offset,
                length,
                decompressed,
                lzss.clone(),
            ));
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(b"a.txt\0");
        data.extend_from_slice(&20u32.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0x07, b'a', b'b', b'c']);
        let d = LzsDescriptor::new();
        let mut reader = ArcReader::from_bytes(data);
        assert_eq!(
            d.rate(Path::new("DATA.LZS"), &mut reader).unwrap(),
            Rating::EXTENSION_MATCH + Rating::MAGIC_MATCH + 3 * Rating::CORROBORATING
        );
    }
}
