//! Big-endian archive with a zlib-compressed directory and data stored as
//! independently compressed 4 KiB blocks.
//!
//! ```text
//! "ZPK1"  u32 numFiles  u32 dirCompressed  u32 dirDecompressed
//! zlib(directory)
//! data blocks
//! ```
//! A directory entry is `pstring(u8) name, u32 decompressedLength,
//! u32 blockCount` followed by `blockCount * { u32 offset,
//! u32 compressedLength }`. Block offsets are absolute.
use super::base::*;
use super::sniff::Rating;
use crate::accessor::{ArcReader, ArcWriter};
use crate::archive::ArchiveSession;
use crate::error::ArcResult;
use crate::exporter::Exporter;
use crate::exporter::blocks::{Block, BlockExporter, pack_blocks};
use crate::exporter::zlib::ZlibExporter;
use crate::ext::io::MemWriter;
use crate::guards::*;
use crate::progress::Progress;
use crate::resource::Resource;
use crate::types::*;
use crate::utils::struct_pack::{StructPack, StructUnpack};
use anyhow::Result;
use gamearc_macro::{StructPack, StructUnpack};
use std::path::Path;
use std::sync::Arc;

pub const MAGIC: &[u8; 4] = b"ZPK1";
pub const BLOCK_SIZE: u64 = 4096;
const HEADER_SIZE: u64 = 16;
/// Directories larger than this are treated as corrupt.
const MAX_DIRECTORY_SIZE: u64 = 64 * 1024 * 1024;
/// Spare room left after the compressed directory when rebuilding.
const DIRECTORY_SLACK: u64 = 64;

#[derive(Debug, StructPack, StructUnpack)]
struct Header {
    num_files: u32,
    dir_compressed: u32,
    dir_decompressed: u32,
}

#[derive(Debug, StructPack, StructUnpack)]
struct Entry {
    #[pstring(u8)]
    name: String,
    decompressed_length: u32,
    block_count: u32,
}

#[derive(Debug, StructPack, StructUnpack)]
struct BlockEntry {
    offset: u32,
    compressed_length: u32,
}

#[derive(Debug)]
pub struct ZpackDescriptor {}

impl ZpackDescriptor {
    pub const fn new() -> Self {
        ZpackDescriptor {}
    }
}

/// Builds the uncompressed directory for `entries`, shifting every block
/// offset by `base`.
fn build_directory(
    entries: &[(String, u64, Vec<Block>)],
    base: u64,
    encoding: Encoding,
) -> Result<Vec<u8>> {
    let mut dir = MemWriter::new();
    for (name, decompressed, blocks) in entries {
        Entry {
            name: name.clone(),
            decompressed_length: u32::try_from(*decompressed)?,
            block_count: u32::try_from(blocks.len())?,
        }
        .pack(&mut dir, Endian::Big, encoding)?;
        for block in blocks {
            BlockEntry {
                offset: u32::try_from(block.offset + base)?,
                compressed_length: u32::try_from(block.compressed_length)?,
            }
            .pack(&mut dir, Endian::Big, encoding)?;
        }
    }
    Ok(dir.into_inner())
}

impl FormatDescriptor for ZpackDescriptor {
    fn format(&self) -> &'static ArchiveFormat {
        &ArchiveFormat::Zpack
    }

    fn name(&self) -> &'static str {
        "ZPK1 block archive"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["zpk"]
    }

    fn platforms(&self) -> &'static [Platform] {
        &[Platform::Xbox, Platform::Wii]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            read: true,
            write: true,
            replace: false,
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
        let header = Header::unpack(reader, Endian::Big, Encoding::Utf8)?;
        rating.corroborate(check_num_files(header.num_files as i64));
        rating.corroborate(check_length(
            header.dir_compressed as i64,
            Some(reader.remaining()),
        ));
        // A zlib stream with default settings starts with 0x78.
        if header.dir_compressed > 0 {
            rating.corroborate(reader.read_u8()? == 0x78);
        }
        Ok(rating.score())
    }

    fn read(&self, session: &ArchiveSession, reader: &mut ArcReader) -> Result<Vec<Resource>> {
        reader.set_endian(Endian::Big);
        reader.seek(0)?;
        let magic = reader.read_bytes(MAGIC.len() as u64)?;
        ensure_equals("magic", magic.as_slice(), MAGIC.as_slice())?;
        let encoding = session.encoding(self.default_encoding());
        let header = Header::unpack(reader, Endian::Big, encoding)?;
        let num_files = ensure_num_files(header.num_files as i64, session.max_files())?;
        let dir_compressed =
            ensure_length(header.dir_compressed as i64, Some(reader.remaining()))?;
        let dir_decompressed =
            ensure_length(header.dir_decompressed as i64, Some(MAX_DIRECTORY_SIZE))?;

        let zlib: Arc<dyn Exporter> = Arc::new(ZlibExporter::new(session.config().zlib_level));
        let dir_data = zlib
            .open(reader, HEADER_SIZE, dir_compressed, dir_decompressed)?
            .read_to_vec()?;
        let mut dir = session.temp_buffer(&dir_data)?;
        dir.set_endian(Endian::Big);

        let size = reader.len();
        let mut resources = Vec::with_capacity(num_files.min(4096) as usize);
        for _ in 0..num_files {
            let entry = Entry::unpack(&mut dir, Endian::Big, encoding)?;
            ensure_filename(&entry.name)?;
            let decompressed = entry.decompressed_length as u64;
            ensure_equals(
                "blockCount",
                entry.block_count as u64,
                decompressed.div_ceil(BLOCK_SIZE),
            )?;
            let mut blocks = Vec::with_capacity(entry.block_count.min(4096) as usize);
            let mut left = decompressed;
            for _ in 0..entry.block_count {
                let b = BlockEntry::unpack(&mut dir, Endian::Big, encoding)?;
                let offset = ensure_offset(b.offset as i64, size)?;
                let compressed = ensure_length(b.compressed_length as i64, Some(size - offset))?;
                let block_len = left.min(BLOCK_SIZE);
                left -= block_len;
                blocks.push(Block {
                    offset,
                    compressed_length: compressed,
                    decompressed_length: block_len,
                });
            }
            let start = blocks.iter().map(|b| b.offset).min().unwrap_or(0);
            let end = blocks
                .iter()
                .map(|b| b.offset + b.compressed_length)
                .max()
                .unwrap_or(0);
            resources.push(Resource::compressed(
                entry.name,
                session.path(),
                start,
                end - start,
                decompressed,
                Arc::new(BlockExporter::new(zlib.clone(), blocks)),
            ));
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
        let zlib = ZlibExporter::new(session.config().zlib_level);
        progress.set_max(resources.len() as u64);

        // Offsets are relative to the start of the data area until the
        // compressed directory size is known.
        let mut data = Vec::new();
        let mut entries = Vec::with_capacity(resources.len());
        for (i, resource) in resources.iter().enumerate() {
            progress.set_value(i as u64);
            let content = session.content(resource)?;
            let (packed, mut blocks) = pack_blocks(&zlib, &content, BLOCK_SIZE as usize)?;
            for block in blocks.iter_mut() {
                block.offset += data.len() as u64;
            }
            data.extend_from_slice(&packed);
            entries.push((resource.name.clone(), content.len() as u64, blocks));
            progress.on_entry_complete(&resource.name, true);
        }

        let raw_dir = build_directory(&entries, 0, encoding)?;
        let mut base = HEADER_SIZE + zlib.pack(&raw_dir)?.len() as u64 + DIRECTORY_SLACK;
        let compressed_dir = loop {
            let packed = zlib.pack(&build_directory(&entries, base, encoding)?)?;
            if HEADER_SIZE + packed.len() as u64 <= base {
                break packed;
            }
            base = HEADER_SIZE + packed.len() as u64 + DIRECTORY_SLACK;
        };

        out.set_endian(Endian::Big);
        out.write_bytes(MAGIC)?;
        Header {
            num_files: u32::try_from(resources.len())?,
            dir_compressed: u32::try_from(compressed_dir.len())?,
            dir_decompressed: u32::try_from(raw_dir.len())?,
        }
        .pack(out, Endian::Big, encoding)?;
        out.write_bytes(&compressed_dir)?;
        let pos = out.position()?;
        out.write_padding(base - pos)?;
        out.write_bytes(&data)?;
        progress.set_value(resources.len() as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_size_ignores_base() {
        let entries = vec![(
            "a.bin".to_string(),
            5000,
            vec![
                Block {
                    offset: 0,
                    compressed_length: 10,
                    decompressed_length: 4096,
                },
                Block {
                    offset: 10,
                    compressed_length: 7,
                    decompressed_length: 904,
                },
            ],
        )];
        let a = build_directory(&entries, 0, Encoding::Utf8).unwrap();
        let b = build_directory(&entries, 1000, Encoding::Utf8).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), 1 + 5 + 8 + 2 * 8);
        assert_eq!(&b[14..18], &1000u32.to_be_bytes());
    }
}
