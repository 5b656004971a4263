use crate::accessor::{ArcReader, ArcWriter};
use crate::archive::ArchiveSession;
use crate::error::ArcResult;
use crate::progress::Progress;
use crate::resource::Resource;
use crate::types::*;
use anyhow::Result;
use std::path::Path;

/// Number of leading content bytes sampled for extension guessing.
pub const HEADER_SAMPLE_LEN: usize = 20;

/// The first bytes of a resource's logical content, also viewed as
/// little-endian 32-bit and 16-bit integers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderSample {
    pub bytes: Vec<u8>,
    pub ints: [i32; 5],
    pub shorts: [i16; 10],
}

impl HeaderSample {
    /// Missing bytes read as zero in `ints` and `shorts`.
    pub fn new(bytes: Vec<u8>) -> Self {
        let mut padded = [0u8; HEADER_SAMPLE_LEN];
        let n = bytes.len().min(HEADER_SAMPLE_LEN);
        padded[..n].copy_from_slice(&bytes[..n]);
        let mut ints = [0i32; 5];
        for (i, chunk) in padded.chunks_exact(4).enumerate() {
            ints[i] = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let mut shorts = [0i16; 10];
        for (i, chunk) in padded.chunks_exact(2).enumerate() {
            shorts[i] = i16::from_le_bytes([chunk[0], chunk[1]]);
        }
        HeaderSample {
            bytes,
            ints,
            shorts,
        }
    }

    pub fn starts_with(&self, magic: &[u8]) -> bool {
        self.bytes.starts_with(magic)
    }
}

/// A format's rule set: how to recognise, read and rebuild its archives.
pub trait FormatDescriptor: std::fmt::Debug + Send + Sync {
    fn format(&self) -> &'static ArchiveFormat;

    /// Human readable name.
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str {
        "1.0"
    }

    fn extensions(&self) -> &'static [&'static str];

    fn platforms(&self) -> &'static [Platform] {
        &[Platform::Pc]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_ONLY
    }

    /// Encoding of stored filenames when the configuration names none.
    fn default_encoding(&self) -> Encoding {
        Encoding::Utf8
    }

    /// Speculatively parses the start of `reader` and returns a confidence
    /// score. The reader is positioned at 0 on entry. Errors count as 0.
    fn rate(&self, path: &Path, reader: &mut ArcReader) -> ArcResult<u32>;

    /// Parses the directory into resources in stored order.
    fn read(&self, session: &ArchiveSession, reader: &mut ArcReader) -> Result<Vec<Resource>>;

    /// Emits a complete archive with every offset recomputed in array order.
    fn write(
        &self,
        _session: &ArchiveSession,
        _resources: &[Resource],
        _out: &mut ArcWriter,
        _progress: &mut dyn Progress,
    ) -> Result<()> {
        Err(anyhow::anyhow!("{} archives cannot be rebuilt", self.name()))
    }

    /// Copies the original archive and rewrites only the directory fields of
    /// replaced resources.
    fn replace(
        &self,
        session: &ArchiveSession,
        resources: &[Resource],
        source: &mut ArcReader,
        out: &mut ArcWriter,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        crate::archive::patch::patch_pointers(session, resources, source, out, progress)
    }

    /// Whether the directory carries real filenames. Only archives that do
    /// not get guessed extensions after a read.
    fn stores_names(&self) -> bool {
        true
    }

    /// Fallback extension for resources of archives that store no names.
    fn guess_extension(&self, _resource: &Resource, _sample: &HeaderSample) -> Option<&'static str> {
        None
    }

    fn preview_hint(&self, _resource: &Resource) -> Option<PreviewKind> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sample_views() {
        let s = HeaderSample::new(vec![0x01, 0x00, 0x00, 0x80, 0xFF, 0xFF]);
        assert_eq!(s.ints[0], i32::MIN + 1);
        assert_eq!(s.ints[1], 0xFFFF);
        assert_eq!(s.shorts[2], -1);
        assert_eq!(s.shorts[9], 0);
        assert!(s.starts_with(&[1, 0]));
    }
}
