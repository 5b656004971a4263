//! A framework for detecting, reading and rewriting game data archives.
//!
//! Formats are described by [`formats::FormatDescriptor`] values held in a
//! [`formats::Registry`]. [`archive::Archive::open`] rates every descriptor
//! against a file, reads it with the best match and exposes the contained
//! [`resource::Resource`]s for extraction, rebuilding and patching.
pub mod accessor;
pub mod archive;
pub mod error;
pub mod exporter;
pub mod ext;
pub mod formats;
pub mod guards;
pub mod progress;
pub mod resource;
pub mod types;
pub mod utils;

/// Run-wide tally of archive and resource outcomes.
pub static COUNTER: utils::counter::Counter = utils::counter::Counter::new();
