//! Error types shared by the accessor, guards and exporters.
use thiserror::Error;

pub type ArcResult<T> = Result<T, ArcError>;

#[derive(Error, Debug)]
pub enum ArcError {
    /// A read would run past the end of the source.
    #[error("read of {len} bytes at {pos:#x} exceeds source length {size:#x}")]
    OutOfBounds { pos: u64, len: u64, size: u64 },

    /// A seek target lies outside `[0, size]`.
    #[error("seek to {pos} is outside [0, {size:#x}]")]
    SeekOutOfRange { pos: i128, size: u64 },

    /// A decoded value failed a plausibility guard.
    #[error("implausible {field}: {value}")]
    Implausible { field: &'static str, value: i128 },

    /// A decoded value differs from the constant the format requires.
    #[error("{field} mismatch: expected {expected}, found {found}")]
    Mismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    /// Compressed data could not be decoded or encoded.
    #[error("codec {codec}: {message}")]
    Codec { codec: &'static str, message: String },

    /// Text could not be decoded or encoded with the requested encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The operation is not available for this format or exporter.
    #[error("{0} is not supported")]
    Unsupported(String),

    /// The candidate file is not an archive of the given format.
    #[error("not a {0} archive")]
    NotThisFormat(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArcError {
    pub fn codec(codec: &'static str, message: impl std::fmt::Display) -> Self {
        ArcError::Codec {
            codec,
            message: message.to_string(),
        }
    }

    pub fn implausible(field: &'static str, value: impl Into<i128>) -> Self {
        ArcError::Implausible {
            field,
            value: value.into(),
        }
    }

    /// Errors a speculative parse hits on input of another format.
    pub fn is_probe_negative(&self) -> bool {
        match self {
            ArcError::OutOfBounds { .. }
            | ArcError::SeekOutOfRange { .. }
            | ArcError::Implausible { .. }
            | ArcError::Mismatch { .. }
            | ArcError::Encoding(_)
            | ArcError::NotThisFormat(_) => true,
            ArcError::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

impl From<ArcError> for std::io::Error {
    fn from(e: ArcError) -> Self {
        match e {
            ArcError::Io(e) => e,
            ArcError::OutOfBounds { .. } | ArcError::SeekOutOfRange { .. } => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e)
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
