//! Generic `package` archive.
//!
//! ```text
//! "package\0"  u32 version (1)  u32 numFiles
//! numFiles * { u32 offset, u32 length, u32 nameLength, name }
//! file data
//! ```
//! All integers are little-endian.
use super::base::*;
use super::sniff::Rating;
use crate::accessor::{ArcReader, ArcWriter};
use crate::archive::ArchiveSession;
use crate::error::ArcResult;
use crate::guards::*;
use crate::progress::Progress;
use crate::resource::{FieldRef, PatchPolicy, Resource};
use crate::types::*;
use crate::utils::encoding::encode_string;
use anyhow::Result;
use std::path::Path;

pub const MAGIC: &[u8; 8] = b"package\0";
pub const VERSION: u32 = 1;

#[derive(Debug)]
pub struct PackageDescriptor {}

impl PackageDescriptor {
    pub const fn new() -> Self {
        PackageDescriptor {}
    }
}

impl FormatDescriptor for PackageDescriptor {
    fn format(&self) -> &'static ArchiveFormat {
        &ArchiveFormat::Package
    }

    fn name(&self) -> &'static str {
        "Generic package"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pkg", "package"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            read: true,
            write: true,
            replace: true,
            rename: true,
        }
    }

    fn rate(&self, path: &Path, reader: &mut ArcReader) -> ArcResult<u32> {
        let mut rating = Rating::new();
        rating.extension(path, self.extensions());
        let magic = reader.read_bytes(MAGIC.len() as u64)?;
        if !rating.magic(&magic, MAGIC) {
            return Ok(rating.score());
        }
        let version = reader.read_u32_le()?;
        rating.corroborate(check_equals(version, VERSION));
        let num_files = reader.read_u32_le()?;
        rating.corroborate(check_num_files(num_files as i64));
        if num_files > 0 {
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
        ensure_equals("version", reader.read_u32()?, VERSION)?;
        let num_files = ensure_num_files(reader.read_u32()? as i64, session.max_files())?;
        let encoding = session.encoding(self.default_encoding());
        let size = reader.len();
        let mut resources = Vec::with_capacity(num_files.min(4096) as usize);
        for _ in 0..num_files {
            let entry = reader.position();
            let offset = ensure_offset(reader.read_u32()? as i64, size)?;
            let length = ensure_length(reader.read_u32()? as i64, Some(size - offset))?;
            let name_len = ensure_filename_length(reader.read_u32()? as i64)?;
            let name = reader.read_fstring(name_len, encoding)?;
            ensure_filename(&name)?;
            resources.push(
                Resource::new(name, session.path(), offset, length).with_patch(
                    PatchPolicy::PatchableAt {
                        offset_field: FieldRef::u32_le(entry),
                        length_field: FieldRef::u32_le(entry + 4),
                        decompressed_field: None,
                    },
                ),
            );
        }
        Ok(resources)
    }

    fn write(
        &self,
        session: &ArchiveSession,
        resources: &[Resource],
        out: &mut ArcWriter,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let encoding = match session.encoding(self.default_encoding()) {
            Encoding::Auto => Encoding::Utf8,
            enc => enc,
        };
        let count = u32::try_from(resources.len())?;
        out.set_endian(Endian::Little);
        out.write_bytes(MAGIC)?;
        out.write_u32(VERSION)?;
        out.write_u32(count)?;

        let mut fields = Vec::with_capacity(resources.len());
        for resource in resources {
            let name = encode_string(encoding, &resource.name, true)?;
            fields.push(out.position()?);
            out.write_u32(0)?;
            out.write_u32(0)?;
            out.write_u32(u32::try_from(name.len())?)?;
            out.write_bytes(&name)?;
        }

        progress.set_max(resources.len() as u64);
        for (i, (resource, entry)) in resources.iter().zip(fields).enumerate() {
            progress.set_value(i as u64);
            let offset = out.position()?;
            let length = if resource.is_replaced() {
                let data = session.content(resource)?;
                out.write_bytes(&data)?;
                data.len() as u64
            } else {
                session.extract_to(resource, out)?
            };
            out.patch_field(FieldRef::u32_le(entry), offset)?;
            out.patch_field(FieldRef::u32_le(entry + 4), length)?;
            progress.on_entry_complete(&resource.name, true);
        }
        progress.set_value(resources.len() as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&29u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.push(b'a');
        data.extend_from_slice(b"hi");
        data
    }

    #[test]
    fn test_rate() {
        let d = PackageDescriptor::new();
        let mut reader = ArcReader::from_bytes(fixture());
        assert_eq!(
            d.rate(Path::new("x.pkg"), &mut reader).unwrap(),
            Rating::EXTENSION_MATCH + Rating::MAGIC_MATCH + 3 * Rating::CORROBORATING
        );
        let mut reader = ArcReader::from_bytes(b"packagf\0".to_vec());
        assert_eq!(d.rate(Path::new("x.bin"), &mut reader).unwrap(), 0);
        let mut reader = ArcReader::from_bytes(Vec::new());
        assert!(d.rate(Path::new("x.bin"), &mut reader).is_err());
    }
}
