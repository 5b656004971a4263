//! Paired index and data archives.
//!
//! `name.dir` holds 40-byte records with no count: a 32-byte name XOR'd
//! with 0x5A, then little-endian `u32 offset` and `u32 length` into
//! `name.pak`. Records are read until the end of the index or the first
//! implausible record.
use super::base::*;
use super::sniff::Rating;
use crate::accessor::ArcReader;
use crate::archive::ArchiveSession;
use crate::error::{ArcError, ArcResult};
use crate::guards::*;
use crate::resource::Resource;
use crate::types::*;
use crate::utils::encoding::decode_to_string;
use crate::utils::files::find_sibling;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub const RECORD_SIZE: u64 = 40;
pub const NAME_SIZE: usize = 32;
pub const NAME_KEY: u8 = 0x5A;
const PROBE_WINDOW: usize = 4096;

#[derive(Debug)]
struct Record {
    name: String,
    offset: u64,
    length: u64,
}

/// Reads one record, or fails if any field is implausible.
fn read_record(dir: &mut ArcReader, pak_len: u64, encoding: Encoding) -> ArcResult<Record> {
    let mut raw = dir.read_bytes(NAME_SIZE as u64)?;
    for b in raw.iter_mut() {
        *b ^= NAME_KEY;
    }
    if let Some(nul) = raw.iter().position(|&b| b == 0) {
        raw.truncate(nul);
    }
    let name = decode_to_string(encoding, &raw)?;
    ensure_filename(&name)?;
    let offset = ensure_offset(dir.read_u32_le()? as i64, pak_len)?;
    let length = ensure_length(dir.read_u32_le()? as i64, Some(pak_len - offset))?;
    Ok(Record {
        name,
        offset,
        length,
    })
}

/// Resolves `(index, data)` paths from either half of the pair.
fn pair(path: &Path) -> Option<(PathBuf, PathBuf)> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("dir") {
        Some((path.to_path_buf(), find_sibling(path, "pak")?))
    } else if ext.eq_ignore_ascii_case("pak") {
        Some((find_sibling(path, "dir")?, path.to_path_buf()))
    } else {
        None
    }
}

#[derive(Debug)]
pub struct DirPakDescriptor {}

impl DirPakDescriptor {
    pub const fn new() -> Self {
        DirPakDescriptor {}
    }

    fn scan(&self, dir: &mut ArcReader, pak_len: u64, encoding: Encoding, max_files: u64) -> ArcResult<Vec<Record>> {
        let mut records = Vec::new();
        while dir.remaining() >= RECORD_SIZE && (records.len() as u64) < max_files {
            let start = dir.position();
            match read_record(dir, pak_len, encoding) {
                Ok(record) => records.push(record),
                Err(e) if e.is_probe_negative() => {
                    tracing::debug!("Index scan stopped at {:#x}: {}", start, e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if records.is_empty() {
            return Err(ArcError::NotThisFormat("dir/pak"));
        }
        Ok(records)
    }
}

impl FormatDescriptor for DirPakDescriptor {
    fn format(&self) -> &'static ArchiveFormat {
        &ArchiveFormat::DirPak
    }

    fn name(&self) -> &'static str {
        "Paired DIR/PAK"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pak", "dir"]
    }

    fn platforms(&self) -> &'static [Platform] {
        &[Platform::Pc, Platform::Ps2]
    }

    fn rate(&self, path: &Path, reader: &mut ArcReader) -> ArcResult<u32> {
        let Some((dir_path, pak_path)) = pair(path) else {
            return Ok(0);
        };
        let mut rating = Rating::new();
        rating.extension(path, self.extensions());
        let pak_len = std::fs::metadata(&pak_path)?.len();
        rating.corroborate(pak_len > 0);
        let mut opened;
        let dir = if dir_path == path {
            reader
        } else {
            opened = ArcReader::open_with_window(&dir_path, PROBE_WINDOW)?;
            &mut opened
        };
        rating.corroborate(dir.len() > 0 && dir.len() % RECORD_SIZE == 0);
        let record = read_record(dir, pak_len, Encoding::Auto)?;
        rating.corroborate(record.length > 0);
        // Data files are normally packed from the start.
        rating.corroborate(record.offset == 0);
        Ok(rating.score())
    }

    fn read(&self, session: &ArchiveSession, reader: &mut ArcReader) -> Result<Vec<Resource>> {
        let (dir_path, pak_path) = pair(session.path())
            .ok_or_else(|| anyhow::anyhow!("No matching .dir/.pak pair for {}", session.path().display()))?;
        let pak_len = session.source_len(&pak_path)?;
        let encoding = session.encoding(self.default_encoding());
        let mut opened;
        let dir = if dir_path == session.path() {
            reader
        } else {
            opened = session.open_path(&dir_path)?;
            &mut opened
        };
        dir.seek(0)?;
        let records = self.scan(dir, pak_len, encoding, session.max_files())?;
        tracing::debug!("{} index records in {}", records.len(), dir_path.display());
        Ok(records
            .into_iter()
            .map(|r| Resource::new(r.name, &pak_path, r.offset, r.length))
            .collect())
    }

    fn default_encoding(&self) -> Encoding {
        Encoding::Auto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, offset: u32, length: u32) -> Vec<u8> {
        let mut out = vec![0u8; NAME_SIZE];
        out[..name.len()].copy_from_slice(name.as_bytes());
        for b in out.iter_mut() {
            *b ^= NAME_KEY;
        }
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&length.to_le_bytes());
        out
    }

    #[test]
    fn test_scan_stops_at_implausible_record() {
        let mut dir = record("a.txt", 0, 4);
        dir.extend(record("b.txt", 4, 6));
        dir.extend(record("c.txt", 9, 100));
        let mut reader = ArcReader::from_bytes(dir);
        let records = DirPakDescriptor::new()
            .scan(&mut reader, 10, Encoding::Utf8, 100)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "b.txt");
        assert_eq!(records[1].offset, 4);
    }

    #[test]
    fn test_rate_counts_only_observed_signals() {
        let dir = tempfile::tempdir().unwrap();
        let pak = dir.path().join("set.pak");
        std::fs::write(&pak, b"0123456789").unwrap();
        std::fs::write(dir.path().join("set.dir"), record("a.txt", 0, 4)).unwrap();
        let mut reader = ArcReader::open(&pak).unwrap();
        // extension, data present, whole records, non-empty entry, packed from 0
        assert_eq!(DirPakDescriptor::new().rate(&pak, &mut reader).unwrap(), 45);

        std::fs::write(dir.path().join("set.dir"), record("a.txt", 3, 0)).unwrap();
        let mut reader = ArcReader::open(&pak).unwrap();
        assert_eq!(DirPakDescriptor::new().rate(&pak, &mut reader).unwrap(), 35);

        let lonely = dir.path().join("lonely.pak");
        std::fs::write(&lonely, b"x").unwrap();
        let mut reader = ArcReader::open(&lonely).unwrap();
        assert_eq!(DirPakDescriptor::new().rate(&lonely, &mut reader).unwrap(), 0);
    }

    #[test]
    fn test_scan_rejects_garbage() {
        let mut reader = ArcReader::from_bytes(vec![NAME_KEY; 40]);
        assert!(DirPakDescriptor::new().scan(&mut reader, 10, Encoding::Utf8, 100).is_err());
    }
}
