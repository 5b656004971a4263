//! Extensions for `std::io` readers and writers.
use crate::types::Encoding;
use crate::utils::encoding::{decode_to_string, encode_string};
use std::io::*;

/// Helpers used by derived record readers.
pub trait ReadExt {
    /// Reads a field of exactly `len` bytes, optionally cut at the first NUL.
    fn read_fstring(&mut self, len: usize, encoding: Encoding, trim: bool) -> Result<String>;

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>>;
}

impl<T: Read> ReadExt for T {
    fn read_fstring(&mut self, len: usize, encoding: Encoding, trim: bool) -> Result<String> {
        let mut buf = self.read_exact_vec(len)?;
        if trim {
            if let Some(pos) = buf.iter().position(|&b| b == 0) {
                buf.truncate(pos);
            }
        }
        decode_to_string(encoding, &buf).map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

pub trait WriteExt {
    fn write_zeros(&mut self, count: usize) -> Result<()>;
    /// Writes `value` into a field of exactly `len` bytes, NUL padded.
    fn write_fstring(&mut self, value: &str, len: usize, encoding: Encoding) -> Result<()>;
}

impl<T: Write> WriteExt for T {
    fn write_zeros(&mut self, count: usize) -> Result<()> {
        const ZEROS: [u8; 256] = [0; 256];
        let mut left = count;
        while left > 0 {
            let n = left.min(ZEROS.len());
            self.write_all(&ZEROS[..n])?;
            left -= n;
        }
        Ok(())
    }

    fn write_fstring(&mut self, value: &str, len: usize, encoding: Encoding) -> Result<()> {
        let encoded =
            encode_string(encoding, value, true).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        if encoded.len() > len {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("string '{}' does not fit in {} bytes", value, len),
            ));
        }
        self.write_all(&encoded)?;
        self.write_zeros(len - encoded.len())
    }
}

/// An owned in-memory reader.
pub struct MemReader {
    pub data: Vec<u8>,
    pos: usize,
}

impl std::fmt::Debug for MemReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemReader")
            .field("pos", &self.pos)
            .field("data_length", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl MemReader {
    pub fn new(data: Vec<u8>) -> Self {
        MemReader { data, pos: 0 }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

fn mem_read(data: &[u8], pos: &mut usize, buf: &mut [u8]) -> usize {
    if *pos >= data.len() {
        return 0;
    }
    let n = buf.len().min(data.len() - *pos);
    buf[..n].copy_from_slice(&data[*pos..*pos + n]);
    *pos += n;
    n
}

fn mem_seek(len: usize, cur: usize, pos: SeekFrom) -> Result<usize> {
    let target = match pos {
        SeekFrom::Start(offset) => offset as i128,
        SeekFrom::End(offset) => len as i128 + offset as i128,
        SeekFrom::Current(offset) => cur as i128 + offset as i128,
    };
    if target < 0 || target > len as i128 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("seek to {} is outside [0, {}]", target, len),
        ));
    }
    Ok(target as usize)
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(mem_read(&self.data, &mut self.pos, buf))
    }
}

impl Seek for MemReader {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.pos = mem_seek(self.data.len(), self.pos, pos)?;
        Ok(self.pos as u64)
    }

    fn stream_position(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }
}

/// A growable in-memory writer. Writing past the end zero-fills the gap.
#[derive(Debug, Default)]
pub struct MemWriter {
    pub data: Vec<u8>,
    pos: usize,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let end = self.pos + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Seek for MemWriter {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(offset) => self.data.len() as i128 + offset as i128,
            SeekFrom::Current(offset) => self.pos as i128 + offset as i128,
        };
        if target < 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_vec_is_all_or_nothing() {
        let mut r = MemReader::new(vec![1, 2, 3]);
        assert_eq!(r.read_exact_vec(2).unwrap(), [1, 2]);
        assert!(r.read_exact_vec(2).is_err());
    }

    #[test]
    fn test_mem_writer_seek_and_overwrite() {
        let mut w = MemWriter::new();
        w.write_zeros(4).unwrap();
        w.write_all(b"data").unwrap();
        w.seek(SeekFrom::Start(0)).unwrap();
        w.write_all(&8u32.to_le_bytes()).unwrap();
        assert_eq!(w.as_slice(), &[8, 0, 0, 0, b'd', b'a', b't', b'a']);
        w.seek(SeekFrom::Start(10)).unwrap();
        w.write_all(&[1]).unwrap();
        assert_eq!(w.as_slice().len(), 11);
        assert_eq!(w.as_slice()[8..], [0, 0, 1]);
    }

    #[test]
    fn test_seek_outside_is_error() {
        let mut r = MemReader::new(vec![0; 4]);
        assert!(r.seek(SeekFrom::Start(5)).is_err());
        assert!(r.seek(SeekFrom::Current(-1)).is_err());
        assert_eq!(r.seek(SeekFrom::End(0)).unwrap(), 4);
    }

    #[test]
    fn test_fstring_round_trip() {
        let mut w = MemWriter::new();
        w.write_fstring("abc", 8, Encoding::Utf8).unwrap();
        assert_eq!(w.as_slice().len(), 8);
        let mut r = MemReader::new(w.into_inner());
        assert_eq!(r.read_fstring(8, Encoding::Utf8, true).unwrap(), "abc");
        let mut w = MemWriter::new();
        assert!(w.write_fstring("too long", 4, Encoding::Utf8).is_err());
    }
}
