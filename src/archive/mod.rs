//! Opening archives and running read, extract, rebuild and patch passes.
pub mod patch;

use crate::COUNTER;
use crate::accessor::{ArcReader, ArcWriter};
use crate::error::{ArcError, ArcResult};
use crate::formats::base::HEADER_SAMPLE_LEN;
use crate::formats::{FormatDescriptor, HeaderSample, Registry, Sniffer};
use crate::guards::check_filename;
use crate::progress::Progress;
use crate::resource::{Replacement, Resource};
use crate::types::*;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Context for one archive: its path, the run configuration and the
/// readers opened on its physical files.
#[derive(Debug)]
pub struct ArchiveSession {
    path: PathBuf,
    config: ExtraConfig,
    sources: RefCell<HashMap<PathBuf, ArcReader>>,
}

impl ArchiveSession {
    pub fn new<P: AsRef<Path>>(path: P, config: ExtraConfig) -> Self {
        ArchiveSession {
            path: path.as_ref().to_path_buf(),
            config,
            sources: RefCell::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ExtraConfig {
        &self.config
    }

    pub fn max_files(&self) -> u64 {
        self.config.max_files
    }

    /// Filename encoding, preferring the configured one.
    pub fn encoding(&self, default: Encoding) -> Encoding {
        self.config.archive_encoding.unwrap_or(default)
    }

    /// Finds a file next to the archive with the same stem and extension
    /// `ext`, ignoring case.
    pub fn sibling(&self, ext: &str) -> Option<PathBuf> {
        crate::utils::files::find_sibling(&self.path, ext)
    }

    /// Opens the archive with the configured window size.
    pub fn open_reader(&self) -> ArcResult<ArcReader> {
        self.open_path(&self.path)
    }

    pub fn open_path(&self, path: &Path) -> ArcResult<ArcReader> {
        ArcReader::open_with_window(path, self.config.buffer_size)
    }

    /// Spills `data` to an anonymous temporary file and returns a reader
    /// over it. The file is removed when the reader is dropped.
    pub fn temp_buffer(&self, data: &[u8]) -> ArcResult<ArcReader> {
        let mut file = tempfile::tempfile()?;
        file.write_all(data)?;
        let mut reader = ArcReader::from_reader(Box::new(file))?;
        reader.set_window_size(self.config.buffer_size);
        Ok(reader)
    }

    /// Runs `f` with a cached reader over `path`.
    pub fn with_source<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&mut ArcReader) -> ArcResult<T>,
    ) -> ArcResult<T> {
        let mut sources = self.sources.borrow_mut();
        if !sources.contains_key(path) {
            let reader = self.open_path(path)?;
            sources.insert(path.to_path_buf(), reader);
        }
        match sources.get_mut(path) {
            Some(reader) => f(reader),
            None => Err(ArcError::Unsupported(format!("reading {}", path.display()))),
        }
    }

    pub fn source_len(&self, path: &Path) -> ArcResult<u64> {
        self.with_source(path, |r| Ok(r.len()))
    }

    /// Logical content of a resource, honouring a pending replacement.
    pub fn content(&self, resource: &Resource) -> Result<Vec<u8>> {
        if let Some(rep) = &resource.replacement {
            return rep
                .load()
                .with_context(|| format!("Failed to load replacement for {}", resource.name));
        }
        self.with_source(&resource.source, |r| resource.read_all(r))
            .with_context(|| format!("Failed to read {}", resource.name))
    }

    /// Streams a resource's archived content into `out`.
    pub fn extract_to<W: Write + ?Sized>(&self, resource: &Resource, out: &mut W) -> ArcResult<u64> {
        self.with_source(&resource.source, |r| resource.extract_to(r, out))
    }

    /// Stored bytes of a resource, without decoding.
    pub fn raw_bytes(&self, resource: &Resource) -> ArcResult<Vec<u8>> {
        self.with_source(&resource.source, |r| {
            resource.validate(r.len())?;
            r.read_bytes_at(resource.offset, resource.length)
        })
    }
}

/// An opened archive: the selected descriptor and its resources.
#[derive(Debug)]
pub struct Archive {
    session: ArchiveSession,
    descriptor: Arc<dyn FormatDescriptor>,
    resources: Vec<Resource>,
}

impl Archive {
    /// Detects the format with `registry` and reads the archive.
    pub fn open<P: AsRef<Path>>(path: P, registry: &Registry, config: ExtraConfig) -> Result<Self> {
        let path = path.as_ref();
        let sniffer = Sniffer::new(registry, &config);
        let candidate = sniffer
            .best(path)
            .with_context(|| format!("Failed to probe {}", path.display()))?
            .ok_or_else(|| anyhow::anyhow!("{} is not a supported archive", path.display()))?;
        Self::open_as(path, candidate.descriptor, config)
    }

    /// Reads the archive with a known descriptor, skipping detection.
    pub fn open_as<P: AsRef<Path>>(
        path: P,
        descriptor: Arc<dyn FormatDescriptor>,
        config: ExtraConfig,
    ) -> Result<Self> {
        let session = ArchiveSession::new(path, config);
        let mut reader = session.open_reader()?;
        let mut resources = descriptor.read(&session, &mut reader).with_context(|| {
            format!(
                "Failed to read {} as {}",
                session.path().display(),
                descriptor.name()
            )
        })?;
        for resource in resources.iter() {
            let size = session.source_len(&resource.source)?;
            resource
                .validate(size)
                .with_context(|| format!("Invalid entry {}", resource.name))?;
        }
        if session.config().guess_extensions && !descriptor.stores_names() {
            guess_extensions(&session, descriptor.as_ref(), &mut resources);
        }
        tracing::info!(
            "Opened {} as {} ({} resources)",
            session.path().display(),
            descriptor.name(),
            resources.len()
        );
        Ok(Archive {
            session,
            descriptor,
            resources,
        })
    }

    pub fn session(&self) -> &ArchiveSession {
        &self.session
    }

    pub fn path(&self) -> &Path {
        self.session.path()
    }

    pub fn descriptor(&self) -> &Arc<dyn FormatDescriptor> {
        &self.descriptor
    }

    pub fn format(&self) -> ArchiveFormat {
        *self.descriptor.format()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.name == name)
    }

    pub fn preview_hint(&self, index: usize) -> Option<PreviewKind> {
        let resource = self.resources.get(index)?;
        self.descriptor
            .preview_hint(resource)
            .or_else(|| resource.extension().and_then(crate::utils::magic::preview_for_extension))
    }

    fn resource(&self, index: usize) -> Result<&Resource> {
        self.resources
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("No resource at index {}", index))
    }

    /// Streams one resource's logical content into `out`.
    pub fn extract<W: Write + ?Sized>(&self, index: usize, out: &mut W) -> Result<u64> {
        let resource = self.resource(index)?;
        self.session
            .extract_to(resource, out)
            .with_context(|| format!("Failed to extract {}", resource.name))
    }

    /// Extracts every resource below `out_dir`. A resource that fails to
    /// decode or whose name escapes `out_dir` is logged and skipped. Returns the number extracted.
    pub fn extract_all(&self, out_dir: &Path, progress: &mut dyn Progress) -> Result<usize> {
        progress.set_max(self.resources.len() as u64);
        let mut extracted = 0;
        for (i, resource) in self.resources.iter().enumerate() {
            progress.set_value(i as u64);
            let result = (|| -> Result<()> {
                let target = crate::utils::files::safe_join(out_dir, &resource.name)?;
                crate::utils::files::make_sure_dir_exists(&target)?;
                let mut out = ArcWriter::create(&target)?;
                self.session.extract_to(resource, &mut out)?;
                out.finish()?;
                Ok(())
            })();
            match result {
                Ok(()) => {
                    extracted += 1;
                    COUNTER.resource_done();
                    progress.on_entry_complete(&resource.name, true);
                }
                Err(e) => {
                    tracing::warn!("Failed to extract {}: {:#}", resource.name, e);
                    COUNTER.resource_failed();
                    progress.on_entry_complete(&resource.name, false);
                }
            }
        }
        progress.set_value(self.resources.len() as u64);
        Ok(extracted)
    }

    /// Schedules new content for a resource.
    pub fn set_replacement(&mut self, index: usize, replacement: Replacement) -> Result<()> {
        let resource = self
            .resources
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("No resource at index {}", index))?;
        resource.replace_with(replacement);
        Ok(())
    }

    pub fn rename(&mut self, index: usize, name: &str) -> Result<()> {
        if !self.descriptor.capabilities().rename {
            anyhow::bail!("{} archives do not support renaming", self.descriptor.name());
        }
        if !check_filename(name) {
            anyhow::bail!("Invalid resource name {:?}", name);
        }
        let resource = self
            .resources
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("No resource at index {}", index))?;
        resource.name = name.to_string();
        Ok(())
    }

    /// Swaps two resources, changing the order of a later rebuild.
    pub fn reorder(&mut self, a: usize, b: usize) -> Result<()> {
        if a >= self.resources.len() || b >= self.resources.len() {
            anyhow::bail!("Resource index out of range");
        }
        self.resources.swap(a, b);
        Ok(())
    }

    /// Rebuilds the archive at `out`. Nothing is written to `out` unless the
    /// whole pass succeeds.
    pub fn write<P: AsRef<Path>>(&self, out: P, progress: &mut dyn Progress) -> Result<()> {
        let out = out.as_ref();
        if !self.descriptor.capabilities().write {
            anyhow::bail!("{} archives cannot be rebuilt", self.descriptor.name());
        }
        let mut writer = ArcWriter::create(out)?;
        self.descriptor
            .write(&self.session, &self.resources, &mut writer, progress)
            .with_context(|| format!("Failed to rebuild {}", out.display()))?;
        writer.finish()?;
        tracing::info!("Rebuilt {} into {}", self.path().display(), out.display());
        Ok(())
    }

    /// Writes a copy of the archive to `out` with replaced resources patched
    /// in place.
    pub fn replace<P: AsRef<Path>>(&self, out: P, progress: &mut dyn Progress) -> Result<()> {
        let out = out.as_ref();
        if !self.descriptor.capabilities().replace {
            anyhow::bail!("{} archives cannot be patched", self.descriptor.name());
        }
        let mut source = self.session.open_reader()?;
        let mut writer = ArcWriter::create(out)?;
        self.descriptor
            .replace(&self.session, &self.resources, &mut source, &mut writer, progress)
            .with_context(|| format!("Failed to patch {}", out.display()))?;
        writer.finish()?;
        tracing::info!("Patched {} into {}", self.path().display(), out.display());
        Ok(())
    }
}

/// Appends a guessed extension to synthetic resource names.
fn guess_extensions(session: &ArchiveSession, descriptor: &dyn FormatDescriptor, resources: &mut [Resource]) {
    for resource in resources.iter_mut() {
        if resource.extension().is_some() || resource.decompressed_length == 0 {
            continue;
        }
        let bytes = match session.with_source(&resource.source, |r| {
            resource.header_bytes(r, HEADER_SAMPLE_LEN)
        }) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Cannot sample {}: {}", resource.name, e);
                continue;
            }
        };
        let sample = HeaderSample::new(bytes);
        let ext = descriptor
            .guess_extension(resource, &sample)
            .or_else(|| crate::utils::magic::guess_extension(&sample));
        if let Some(ext) = ext {
            tracing::trace!("Guessed .{} for {}", ext, resource.name);
            resource.name = format!("{}.{}", resource.name, ext);
        }
    }
}
