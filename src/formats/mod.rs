//! Format descriptors and the registry that detection runs over.
pub mod base;
#[cfg(feature = "dirpak")]
pub mod dirpak;
#[cfg(feature = "lzs")]
pub mod lzs;
#[cfg(feature = "package")]
pub mod package;
pub mod sniff;
#[cfg(feature = "zpack")]
pub mod zpack;

pub use base::{FormatDescriptor, HeaderSample};
pub use sniff::{Candidate, Rating, Sniffer};

use crate::types::ArchiveFormat;
use std::sync::Arc;

/// An ordered set of descriptors. Order breaks ties between equal scores.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    descriptors: Vec<Arc<dyn FormatDescriptor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every descriptor compiled into this build.
    pub fn builtin() -> Self {
        let mut registry = Registry::new();
        #[cfg(feature = "package")]
        registry.register(Arc::new(package::PackageDescriptor::new()));
        #[cfg(feature = "zpack")]
        registry.register(Arc::new(zpack::ZpackDescriptor::new()));
        #[cfg(feature = "lzs")]
        registry.register(Arc::new(lzs::LzsDescriptor::new()));
        #[cfg(feature = "dirpak")]
        registry.register(Arc::new(dirpak::DirPakDescriptor::new()));
        registry
    }

    pub fn register(&mut self, descriptor: Arc<dyn FormatDescriptor>) {
        self.descriptors.push(descriptor);
    }

    pub fn descriptors(&self) -> &[Arc<dyn FormatDescriptor>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn get(&self, format: ArchiveFormat) -> Option<&Arc<dyn FormatDescriptor>> {
        self.descriptors.iter().find(|d| *d.format() == format)
    }

    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self
            .descriptors
            .iter()
            .flat_map(|d| d.extensions())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }
}

lazy_static::lazy_static! {
    pub static ref REGISTRY: Registry = Registry::builtin();
    pub static ref ALL_EXTS: Vec<String> = REGISTRY.extensions();
}
