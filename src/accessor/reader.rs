use super::{DEFAULT_WINDOW_SIZE, MIN_WINDOW_SIZE, ReadSeek};
use crate::error::{ArcError, ArcResult};
use crate::ext::io::MemReader;
use crate::types::{Encoding, Endian};
use crate::utils::encoding::{decode_to_string, decode_utf16le};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

macro_rules! endian_read {
    ($name:ident, $le:ident, $be:ident, $ty:ty) => {
        pub fn $name(&mut self) -> ArcResult<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            self.fill(&mut buf)?;
            Ok(match self.endian {
                Endian::Little => <$ty>::from_le_bytes(buf),
                Endian::Big => <$ty>::from_be_bytes(buf),
            })
        }

        pub fn $le(&mut self) -> ArcResult<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            self.fill(&mut buf)?;
            Ok(<$ty>::from_le_bytes(buf))
        }

        pub fn $be(&mut self) -> ArcResult<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            self.fill(&mut buf)?;
            Ok(<$ty>::from_be_bytes(buf))
        }
    };
}

/// Buffered random-access reader over an archive.
///
/// Every read is checked against the source length before any byte is
/// fetched, so a garbage length decoded from a wrong header fails with
/// [`ArcError::OutOfBounds`] instead of allocating or blocking.
#[derive(Debug)]
pub struct ArcReader {
    inner: Box<dyn ReadSeek>,
    path: Option<PathBuf>,
    len: u64,
    pos: u64,
    origin: u64,
    endian: Endian,
    window: Vec<u8>,
    window_start: u64,
    window_len: usize,
    window_size: usize,
}

impl ArcReader {
    pub fn open<P: AsRef<Path>>(path: P) -> ArcResult<Self> {
        Self::open_with_window(path, DEFAULT_WINDOW_SIZE)
    }

    pub fn open_with_window<P: AsRef<Path>>(path: P, window_size: usize) -> ArcResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut reader = Self::from_reader(Box::new(file))?;
        reader.path = Some(path.to_path_buf());
        reader.set_window_size(window_size);
        Ok(reader)
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        let len = data.len() as u64;
        Self::with_len(Box::new(MemReader::new(data)), len)
    }

    pub fn from_reader(mut inner: Box<dyn ReadSeek>) -> ArcResult<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self::with_len(inner, len))
    }

    fn with_len(inner: Box<dyn ReadSeek>, len: u64) -> Self {
        ArcReader {
            inner,
            path: None,
            len,
            pos: 0,
            origin: 0,
            endian: Endian::Little,
            window: Vec::new(),
            window_start: 0,
            window_len: 0,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn remaining(&self) -> u64 {
        self.len - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.len
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Toggles the byte order used by the unsuffixed primitive reads.
    pub fn change_format(&mut self) {
        self.endian = self.endian.swapped();
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Resizes the read window. Small windows suit sniffing; large ones
    /// suit long sequential scans.
    pub fn set_window_size(&mut self, size: usize) {
        let size = size.max(MIN_WINDOW_SIZE);
        if size != self.window_size {
            self.window_size = size;
            self.window = Vec::new();
            self.window_len = 0;
        }
    }

    pub fn seek(&mut self, pos: u64) -> ArcResult<()> {
        if pos > self.len {
            return Err(ArcError::SeekOutOfRange {
                pos: pos as i128,
                size: self.len,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Moves forwards or backwards from the current position.
    pub fn skip(&mut self, delta: i64) -> ArcResult<()> {
        let target = self.pos as i128 + delta as i128;
        if target < 0 || target > self.len as i128 {
            return Err(ArcError::SeekOutOfRange {
                pos: target,
                size: self.len,
            });
        }
        self.pos = target as u64;
        Ok(())
    }

    /// Skips to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: u64) -> ArcResult<()> {
        if alignment > 1 {
            let rem = self.pos % alignment;
            if rem != 0 {
                self.seek(self.pos + alignment - rem)?;
            }
        }
        Ok(())
    }

    /// Sets the origin used by [`relative_seek`](Self::relative_seek).
    pub fn set_origin(&mut self, origin: u64) -> ArcResult<()> {
        if origin > self.len {
            return Err(ArcError::SeekOutOfRange {
                pos: origin as i128,
                size: self.len,
            });
        }
        self.origin = origin;
        Ok(())
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Seeks relative to the sub-view origin. Directories embedded in a
    /// larger buffer store offsets relative to their own start.
    pub fn relative_seek(&mut self, pos: u64) -> ArcResult<()> {
        let target = self.origin.checked_add(pos).ok_or(ArcError::SeekOutOfRange {
            pos: self.origin as i128 + pos as i128,
            size: self.len,
        })?;
        self.seek(target)
    }

    pub fn relative_position(&self) -> u64 {
        self.pos.saturating_sub(self.origin)
    }

    fn window_hit(&self) -> usize {
        let end = self.window_start + self.window_len as u64;
        if self.pos >= self.window_start && self.pos < end {
            (end - self.pos) as usize
        } else {
            0
        }
    }

    fn refill(&mut self) -> ArcResult<()> {
        let want = (self.window_size as u64).min(self.len - self.pos) as usize;
        if self.window.len() < self.window_size {
            self.window.resize(self.window_size, 0);
        }
        self.inner.seek(SeekFrom::Start(self.pos))?;
        self.inner.read_exact(&mut self.window[..want])?;
        self.window_start = self.pos;
        self.window_len = want;
        Ok(())
    }

    /// Fills `buf` entirely or fails without consuming anything.
    pub fn fill(&mut self, buf: &mut [u8]) -> ArcResult<()> {
        let n = buf.len() as u64;
        if n > self.remaining() {
            return Err(ArcError::OutOfBounds {
                pos: self.pos,
                len: n,
                size: self.len,
            });
        }
        let mut done = 0;
        while done < buf.len() {
            let hit = self.window_hit();
            if hit > 0 {
                let start = (self.pos - self.window_start) as usize;
                let count = hit.min(buf.len() - done);
                buf[done..done + count].copy_from_slice(&self.window[start..start + count]);
                done += count;
                self.pos += count as u64;
            } else if buf.len() - done >= self.window_size {
                self.inner.seek(SeekFrom::Start(self.pos))?;
                self.inner.read_exact(&mut buf[done..])?;
                self.pos += (buf.len() - done) as u64;
                done = buf.len();
            } else {
                self.refill()?;
            }
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> ArcResult<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i8(&mut self) -> ArcResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    endian_read!(read_u16, read_u16_le, read_u16_be, u16);
    endian_read!(read_i16, read_i16_le, read_i16_be, i16);
    endian_read!(read_u32, read_u32_le, read_u32_be, u32);
    endian_read!(read_i32, read_i32_le, read_i32_be, i32);
    endian_read!(read_u64, read_u64_le, read_u64_be, u64);
    endian_read!(read_i64, read_i64_le, read_i64_be, i64);

    pub fn read_u24(&mut self) -> ArcResult<u32> {
        let mut buf = [0u8; 3];
        self.fill(&mut buf)?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes([buf[0], buf[1], buf[2], 0]),
            Endian::Big => u32::from_be_bytes([0, buf[0], buf[1], buf[2]]),
        })
    }

    pub fn read_bytes(&mut self, len: u64) -> ArcResult<Vec<u8>> {
        if len > self.remaining() {
            return Err(ArcError::OutOfBounds {
                pos: self.pos,
                len,
                size: self.len,
            });
        }
        let mut buf = vec![0u8; len as usize];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Reads `len` bytes at `offset` and returns to the current position.
    pub fn read_bytes_at(&mut self, offset: u64, len: u64) -> ArcResult<Vec<u8>> {
        let saved = self.pos;
        self.seek(offset)?;
        let data = self.read_bytes(len);
        self.pos = saved;
        data
    }

    /// Returns up to `len` upcoming bytes without consuming them.
    pub fn peek_bytes(&mut self, len: u64) -> ArcResult<Vec<u8>> {
        let saved = self.pos;
        let data = self.read_bytes(len.min(self.remaining()));
        self.pos = saved;
        data
    }

    /// Reads a fixed-width string field, cut at the first NUL.
    pub fn read_fstring(&mut self, len: u64, encoding: Encoding) -> ArcResult<String> {
        let mut raw = self.read_bytes(len)?;
        if let Some(nul) = raw.iter().position(|&b| b == 0) {
            raw.truncate(nul);
        }
        decode_to_string(encoding, &raw)
    }

    /// Reads a NUL-terminated string of at most `max` bytes. A string that
    /// fills the whole width needs no terminator.
    pub fn read_cstring(&mut self, max: u64, encoding: Encoding) -> ArcResult<String> {
        let mut raw = Vec::new();
        while (raw.len() as u64) < max {
            let byte = self.read_u8()?;
            if byte == 0 {
                return decode_to_string(encoding, &raw);
            }
            raw.push(byte);
        }
        decode_to_string(encoding, &raw)
    }

    pub fn read_pstring_u8(&mut self, encoding: Encoding) -> ArcResult<String> {
        let len = self.read_u8()? as u64;
        self.read_fstring(len, encoding)
    }

    pub fn read_pstring_u16(&mut self, encoding: Encoding) -> ArcResult<String> {
        let len = self.read_u16()? as u64;
        self.read_fstring(len, encoding)
    }

    pub fn read_pstring_u32(&mut self, encoding: Encoding) -> ArcResult<String> {
        let len = self.read_u32()? as u64;
        self.read_fstring(len, encoding)
    }

    /// Reads `chars` UTF-16LE code units.
    pub fn read_utf16(&mut self, chars: u64) -> ArcResult<String> {
        let raw = self.read_bytes(chars.saturating_mul(2))?;
        decode_utf16le(&raw)
    }

    /// Reads NUL-terminated UTF-16LE text of at most `max_chars` units.
    pub fn read_utf16_cstring(&mut self, max_chars: u64) -> ArcResult<String> {
        let mut units = Vec::new();
        while (units.len() as u64) < max_chars {
            let unit = self.read_u16_le()?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        String::from_utf16(&units)
            .map_err(|e| ArcError::Encoding(format!("invalid UTF-16: {}", e)))
    }
}

impl Read for ArcReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = (buf.len() as u64).min(self.remaining()) as usize;
        self.fill(&mut buf[..n])?;
        Ok(n)
    }
}

impl Seek for ArcReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::End(d) => self.len as i128 + d as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
        };
        if target < 0 || target > self.len as i128 {
            return Err(ArcError::SeekOutOfRange {
                pos: target,
                size: self.len,
            }
            .into());
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        Ok(self.pos)
    }
}
