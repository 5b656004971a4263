//! XOR-obfuscated stream adapters.
use std::io::{Read, Write};

/// XORs every byte with a single key byte.
pub struct XoredStream<T> {
    inner: T,
    key: u8,
}

impl<T> XoredStream<T> {
    pub fn new(inner: T, key: u8) -> Self {
        XoredStream { inner, key }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Read for XoredStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read_bytes = self.inner.read(buf)?;
        for byte in &mut buf[..read_bytes] {
            *byte ^= self.key;
        }
        Ok(read_bytes)
    }
}

impl<T: Write> Write for XoredStream<T> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let encrypted: Vec<u8> = buf.iter().map(|b| b ^ self.key).collect();
        self.inner.write(&encrypted)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for XoredStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XoredStream")
            .field("inner", &self.inner)
            .field("key", &self.key)
            .finish()
    }
}

/// XORs data with a repeating key, indexed by the number of bytes seen.
pub struct XoredKeyStream<T> {
    inner: T,
    key: Vec<u8>,
    position: u64,
}

impl<T> XoredKeyStream<T> {
    /// `key` must not be empty.
    pub fn new(inner: T, key: Vec<u8>) -> Self {
        XoredKeyStream {
            inner,
            key,
            position: 0,
        }
    }

    fn apply(&self, buf: &mut [u8]) {
        let key_len = self.key.len() as u64;
        if key_len == 0 {
            return;
        }
        let start = (self.position % key_len) as usize;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte ^= self.key[(start + i) % key_len as usize];
        }
    }
}

impl<T: Read> Read for XoredKeyStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.apply(&mut buf[..n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl<T: Write> Write for XoredKeyStream<T> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut encrypted = buf.to_vec();
        self.apply(&mut encrypted);
        let n = self.inner.write(&encrypted)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for XoredKeyStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XoredKeyStream")
            .field("inner", &self.inner)
            .field("position", &self.position)
            .finish()
    }
}
