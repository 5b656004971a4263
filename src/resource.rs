//! The logical file model.
use crate::accessor::ArcReader;
use crate::error::{ArcError, ArcResult};
use crate::exporter::{ExportStream, Exporter};
use crate::types::Endian;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A fixed-width integer field at an absolute position in an archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub position: u64,
    /// Width in bytes: 1, 2, 3, 4 or 8.
    pub width: u8,
    pub endian: Endian,
}

impl FieldRef {
    pub const fn new(position: u64, width: u8, endian: Endian) -> Self {
        FieldRef {
            position,
            width,
            endian,
        }
    }

    pub const fn u32_le(position: u64) -> Self {
        Self::new(position, 4, Endian::Little)
    }

    pub const fn u32_be(position: u64) -> Self {
        Self::new(position, 4, Endian::Big)
    }

    pub fn max_value(&self) -> u64 {
        if self.width >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.width as u32 * 8)) - 1
        }
    }

    /// Encodes `value` at this field's width and byte order.
    pub fn encode(&self, value: u64) -> ArcResult<Vec<u8>> {
        if !matches!(self.width, 1 | 2 | 3 | 4 | 8) {
            return Err(ArcError::Unsupported(format!("{}-byte field", self.width)));
        }
        if value > self.max_value() {
            return Err(ArcError::implausible("field value", value));
        }
        let width = self.width as usize;
        Ok(match self.endian {
            Endian::Little => value.to_le_bytes()[..width].to_vec(),
            Endian::Big => value.to_be_bytes()[8 - width..].to_vec(),
        })
    }
}

/// How a resource's directory entry may be updated by a replace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PatchPolicy {
    /// Only a full rebuild can change this entry.
    #[default]
    Rebuildable,
    /// The entry's pointer fields can be overwritten in place.
    PatchableAt {
        offset_field: FieldRef,
        length_field: FieldRef,
        /// Present when the directory also stores the decompressed size.
        decompressed_field: Option<FieldRef>,
    },
}

/// Content that supersedes the archived bytes of a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Replacement {
    File(PathBuf),
    Bytes(Arc<[u8]>),
}

impl Replacement {
    pub fn load(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Replacement::File(path) => std::fs::read(path),
            Replacement::Bytes(data) => Ok(data.to_vec()),
        }
    }
}

/// One logical file inside an archive.
#[derive(Clone, Debug)]
pub struct Resource {
    pub name: String,
    /// The physical file holding this resource's bytes.
    pub source: PathBuf,
    pub offset: u64,
    /// Stored byte count.
    pub length: u64,
    pub decompressed_length: u64,
    pub exporter: Option<Arc<dyn Exporter>>,
    pub patch: PatchPolicy,
    pub replacement: Option<Replacement>,
}

impl Resource {
    /// An uncompressed resource.
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        Resource {
            name: name.into(),
            source: source.into(),
            offset,
            length,
            decompressed_length: length,
            exporter: None,
            patch: PatchPolicy::Rebuildable,
            replacement: None,
        }
    }

    pub fn compressed(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        offset: u64,
        length: u64,
        decompressed_length: u64,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Resource {
            decompressed_length,
            exporter: Some(exporter),
            ..Self::new(name, source, offset, length)
        }
    }

    pub fn with_patch(mut self, patch: PatchPolicy) -> Self {
        self.patch = patch;
        self
    }

    pub fn is_compressed(&self) -> bool {
        self.exporter.is_some()
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }

    pub fn is_replaced(&self) -> bool {
        self.replacement.is_some()
    }

    pub fn replace_with(&mut self, replacement: Replacement) {
        self.replacement = Some(replacement);
    }

    /// Checks the geometry invariant against the size of `source`.
    pub fn validate(&self, source_size: u64) -> ArcResult<()> {
        match self.offset.checked_add(self.length) {
            Some(end) if end <= source_size => Ok(()),
            _ => Err(ArcError::OutOfBounds {
                pos: self.offset,
                len: self.length,
                size: source_size,
            }),
        }
    }

    /// Opens the logical content of this resource as a stream.
    pub fn open<'a>(&self, reader: &'a mut ArcReader) -> ArcResult<ExportStream<'a>> {
        self.validate(reader.len())?;
        match &self.exporter {
            Some(exporter) => {
                exporter.open(reader, self.offset, self.length, self.decompressed_length)
            }
            None => crate::exporter::stored::Stored.open(
                reader,
                self.offset,
                self.length,
                self.length,
            ),
        }
    }

    /// Streams the logical content into `out`, returning the byte count.
    pub fn extract_to<W: Write + ?Sized>(&self, reader: &mut ArcReader, out: &mut W) -> ArcResult<u64> {
        let mut stream = self.open(reader)?;
        let copied = std::io::copy(&mut stream, out)?;
        Ok(copied)
    }

    pub fn read_all(&self, reader: &mut ArcReader) -> ArcResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.decompressed_length.min(1 << 24) as usize);
        self.extract_to(reader, &mut out)?;
        Ok(out)
    }

    /// Logical content, preferring a replacement over archived bytes.
    pub fn content(&self, reader: &mut ArcReader) -> anyhow::Result<Vec<u8>> {
        match &self.replacement {
            Some(rep) => Ok(rep.load()?),
            None => Ok(self.read_all(reader)?),
        }
    }

    /// Returns the first `len` logical bytes, or fewer for short resources.
    pub fn header_bytes(&self, reader: &mut ArcReader, len: usize) -> ArcResult<Vec<u8>> {
        let mut stream = self.open(reader)?;
        let mut buf = vec![0u8; len.min(self.decompressed_length as usize)];
        let n = stream.read_up_to(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}
