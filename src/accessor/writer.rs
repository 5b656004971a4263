use super::reader::ArcReader;
use crate::error::{ArcError, ArcResult};
use crate::ext::io::{MemWriter, WriteExt};
use crate::resource::FieldRef;
use crate::types::{Encoding, Endian};
use crate::utils::encoding::{encode_string, encode_utf16le};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

macro_rules! endian_write {
    ($name:ident, $le:ident, $be:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) -> ArcResult<()> {
            match self.endian {
                Endian::Little => self.write_bytes(&value.to_le_bytes()),
                Endian::Big => self.write_bytes(&value.to_be_bytes()),
            }
        }

        pub fn $le(&mut self, value: $ty) -> ArcResult<()> {
            self.write_bytes(&value.to_le_bytes())
        }

        pub fn $be(&mut self, value: $ty) -> ArcResult<()> {
            self.write_bytes(&value.to_be_bytes())
        }
    };
}

enum Sink {
    Temp {
        file: BufWriter<NamedTempFile>,
        dest: PathBuf,
    },
    Memory(MemWriter),
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Temp { dest, .. } => f.debug_struct("Temp").field("dest", dest).finish(),
            Sink::Memory(m) => f.debug_tuple("Memory").field(&m.as_slice().len()).finish(),
        }
    }
}

/// Endian-aware output accessor.
///
/// File output goes to a temporary file next to the destination and is
/// renamed into place by [`finish`](Self::finish). Dropping the writer
/// before that discards the partial output.
#[derive(Debug)]
pub struct ArcWriter {
    sink: Sink,
    endian: Endian,
}

impl ArcWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> ArcResult<Self> {
        let dest = path.as_ref().to_path_buf();
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(dir)?;
        Ok(ArcWriter {
            sink: Sink::Temp {
                file: BufWriter::new(temp),
                dest,
            },
            endian: Endian::Little,
        })
    }

    pub fn memory() -> Self {
        ArcWriter {
            sink: Sink::Memory(MemWriter::new()),
            endian: Endian::Little,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn change_format(&mut self) {
        self.endian = self.endian.swapped();
    }

    pub fn destination(&self) -> Option<&Path> {
        match &self.sink {
            Sink::Temp { dest, .. } => Some(dest),
            Sink::Memory(_) => None,
        }
    }

    pub fn position(&mut self) -> ArcResult<u64> {
        Ok(self.stream_position()?)
    }

    pub fn seek_to(&mut self, pos: u64) -> ArcResult<()> {
        self.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn seek_end(&mut self) -> ArcResult<u64> {
        Ok(self.seek(SeekFrom::End(0))?)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> ArcResult<()> {
        self.write_all(data)?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> ArcResult<()> {
        self.write_bytes(&[value])
    }

    endian_write!(write_u16, write_u16_le, write_u16_be, u16);
    endian_write!(write_i16, write_i16_le, write_i16_be, i16);
    endian_write!(write_u32, write_u32_le, write_u32_be, u32);
    endian_write!(write_i32, write_i32_le, write_i32_be, i32);
    endian_write!(write_u64, write_u64_le, write_u64_be, u64);

    pub fn write_padding(&mut self, count: u64) -> ArcResult<()> {
        self.write_zeros(count as usize)?;
        Ok(())
    }

    /// Zero-pads up to the next multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: u64) -> ArcResult<()> {
        if alignment > 1 {
            let rem = self.position()? % alignment;
            if rem != 0 {
                self.write_padding(alignment - rem)?;
            }
        }
        Ok(())
    }

    /// Writes `value` into a NUL padded field of `len` bytes.
    pub fn write_fstring(&mut self, value: &str, len: u64, encoding: Encoding) -> ArcResult<()> {
        WriteExt::write_fstring(self, value, len as usize, encoding)?;
        Ok(())
    }

    pub fn write_cstring(&mut self, value: &str, encoding: Encoding) -> ArcResult<()> {
        let encoded = encode_string(encoding, value, true)?;
        self.write_bytes(&encoded)?;
        self.write_u8(0)
    }

    pub fn write_pstring_u8(&mut self, value: &str, encoding: Encoding) -> ArcResult<()> {
        let encoded = encode_string(encoding, value, true)?;
        let len = u8::try_from(encoded.len())
            .map_err(|_| ArcError::implausible("string length", encoded.len() as u64))?;
        self.write_u8(len)?;
        self.write_bytes(&encoded)
    }

    pub fn write_pstring_u16(&mut self, value: &str, encoding: Encoding) -> ArcResult<()> {
        let encoded = encode_string(encoding, value, true)?;
        let len = u16::try_from(encoded.len())
            .map_err(|_| ArcError::implausible("string length", encoded.len() as u64))?;
        self.write_u16(len)?;
        self.write_bytes(&encoded)
    }

    pub fn write_pstring_u32(&mut self, value: &str, encoding: Encoding) -> ArcResult<()> {
        let encoded = encode_string(encoding, value, true)?;
        let len = u32::try_from(encoded.len())
            .map_err(|_| ArcError::implausible("string length", encoded.len() as u64))?;
        self.write_u32(len)?;
        self.write_bytes(&encoded)
    }

    pub fn write_utf16(&mut self, value: &str) -> ArcResult<()> {
        self.write_bytes(&encode_utf16le(value))
    }

    /// Copies `len` bytes starting at `offset` in `reader` verbatim.
    pub fn copy_from(&mut self, reader: &mut ArcReader, offset: u64, len: u64) -> ArcResult<()> {
        let saved = reader.position();
        reader.seek(offset)?;
        let mut buf = vec![0u8; (len.min(64 * 1024)) as usize];
        let mut left = len;
        while left > 0 {
            let n = left.min(buf.len() as u64) as usize;
            reader.fill(&mut buf[..n])?;
            self.write_bytes(&buf[..n])?;
            left -= n as u64;
        }
        reader.seek(saved)?;
        Ok(())
    }

    /// Overwrites a fixed-width field at its absolute position and returns
    /// to the current write position.
    pub fn patch_field(&mut self, field: FieldRef, value: u64) -> ArcResult<()> {
        let bytes = field.encode(value)?;
        let saved = self.position()?;
        self.seek_to(field.position)?;
        self.write_bytes(&bytes)?;
        self.seek_to(saved)
    }

    /// Flushes and publishes the output.
    pub fn finish(self) -> ArcResult<()> {
        match self.sink {
            Sink::Temp { file, dest } => {
                let temp = file.into_inner().map_err(|e| e.into_error())?;
                temp.persist(&dest).map_err(|e| ArcError::Io(e.error))?;
                tracing::debug!("Wrote {}", dest.display());
                Ok(())
            }
            Sink::Memory(_) => Ok(()),
        }
    }

    /// Returns the bytes of an in-memory writer.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self.sink {
            Sink::Memory(m) => Some(m.into_inner()),
            Sink::Temp { .. } => None,
        }
    }
}

impl Write for ArcWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.sink {
            Sink::Temp { file, .. } => file.write(buf),
            Sink::Memory(m) => m.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.sink {
            Sink::Temp { file, .. } => file.flush(),
            Sink::Memory(m) => m.flush(),
        }
    }
}

impl Seek for ArcWriter {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match &mut self.sink {
            Sink::Temp { file, .. } => file.seek(pos),
            Sink::Memory(m) => m.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_and_padding() {
        let mut w = ArcWriter::memory();
        w.write_u16(0x0102).unwrap();
        w.change_format();
        w.write_u16(0x0102).unwrap();
        w.write_u32_le(7).unwrap();
        w.pad_to(16).unwrap();
        w.write_cstring("ab", Encoding::Utf8).unwrap();
        w.write_pstring_u8("c", Encoding::Utf8).unwrap();
        let data = w.into_bytes().unwrap();
        assert_eq!(&data[..8], &[2, 1, 1, 2, 7, 0, 0, 0]);
        assert!(data[8..16].iter().all(|&b| b == 0));
        assert_eq!(&data[16..], b"ab\0\x01c");
    }

    #[test]
    fn test_strings_read_back() {
        let mut w = ArcWriter::memory();
        w.set_endian(Endian::Big);
        w.write_pstring_u16("名前", Encoding::Cp932).unwrap();
        w.write_pstring_u32("long", Encoding::Utf8).unwrap();
        w.write_utf16("ユニ").unwrap();
        w.write_u8(0xFE).unwrap();
        assert_eq!(w.seek_end().unwrap(), 2 + 4 + 4 + 4 + 4 + 1);
        let mut r = ArcReader::from_bytes(w.into_bytes().unwrap());
        r.set_endian(Endian::Big);
        assert_eq!(r.read_pstring_u16(Encoding::Cp932).unwrap(), "名前");
        assert_eq!(r.read_pstring_u32(Encoding::Utf8).unwrap(), "long");
        assert_eq!(r.read_utf16(2).unwrap(), "ユニ");
        assert_eq!(r.read_i8().unwrap(), -2);
        assert!(r.is_eof());
    }

    #[test]
    fn test_patch_field_restores_position() {
        let mut w = ArcWriter::memory();
        w.write_bytes(&[0xAA; 12]).unwrap();
        w.patch_field(FieldRef::u32_le(4), 0x11223344).unwrap();
        w.write_u8(0xBB).unwrap();
        let data = w.into_bytes().unwrap();
        assert_eq!(&data[4..8], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(data.len(), 13);
        assert_eq!(data[12], 0xBB);
    }

    #[test]
    fn test_unfinished_file_is_not_published() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.pkg");
        {
            let mut w = ArcWriter::create(&dest).unwrap();
            w.write_bytes(b"partial").unwrap();
        }
        assert!(!dest.exists());
        let mut w = ArcWriter::create(&dest).unwrap();
        w.write_bytes(b"complete").unwrap();
        w.finish().unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"complete");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_copy_from_reader() {
        let mut r = ArcReader::from_bytes((0u8..100).collect());
        r.seek(3).unwrap();
        let mut w = ArcWriter::memory();
        w.copy_from(&mut r, 10, 5).unwrap();
        assert_eq!(r.position(), 3);
        assert_eq!(w.into_bytes().unwrap(), vec![10, 11, 12, 13, 14]);
    }
}
