//! Random-access byte accessor used by every descriptor.
//!
//! [`ArcReader`] is a buffered, bounds-checked, endian-aware reader over a
//! file or an in-memory buffer. [`ArcWriter`] mirrors it for output and only
//! publishes the destination file once [`ArcWriter::finish`] succeeds.
pub mod reader;
pub mod writer;

pub use reader::ArcReader;
pub use writer::ArcWriter;

use std::io::{Read, Seek, Write};

pub trait ReadSeek: Read + Seek + std::fmt::Debug {}

pub trait WriteSeek: Write + Seek {}

impl<T: Read + Seek + std::fmt::Debug> ReadSeek for T {}

impl<T: Write + Seek> WriteSeek for T {}

/// Default window of a committed reader.
pub const DEFAULT_WINDOW_SIZE: usize = 64 * 1024;
/// Smallest window a reader accepts.
pub const MIN_WINDOW_SIZE: usize = 16;
