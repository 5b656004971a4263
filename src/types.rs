use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
/// Text Encoding
pub enum Encoding {
    /// Automatically detect encoding
    #[default]
    Auto,
    /// UTF-8 encoding
    Utf8,
    /// Shift-JIS encoding
    Cp932,
    /// GB2312 encoding
    Gb2312,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
/// Text Encoding
pub enum TextEncoding {
    /// Use the format's default encoding
    Default,
    /// Automatically detect encoding
    Auto,
    /// UTF-8 encoding
    Utf8,
    #[value(alias("jis"))]
    /// Shift-JIS encoding
    Cp932,
    #[value(alias("gbk"))]
    /// GB2312 encoding
    Gb2312,
}

impl TextEncoding {
    pub fn to_encoding(self) -> Option<Encoding> {
        match self {
            TextEncoding::Default => None,
            TextEncoding::Auto => Some(Encoding::Auto),
            TextEncoding::Utf8 => Some(Encoding::Utf8),
            TextEncoding::Cp932 => Some(Encoding::Cp932),
            TextEncoding::Gb2312 => Some(Encoding::Gb2312),
        }
    }
}

/// Byte order of multi-byte fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    pub fn swapped(self) -> Self {
        match self {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Archive format
pub enum ArchiveFormat {
    #[cfg(feature = "package")]
    /// Generic `package` directory archive
    Package,
    #[cfg(feature = "dirpak")]
    #[value(alias("dir"), alias("pak"))]
    /// Paired index/data archive (.dir + .pak)
    DirPak,
    #[cfg(feature = "zpack")]
    /// Big-endian archive with zlib blocks and a compressed directory
    Zpack,
    #[cfg(feature = "lzs")]
    /// LZSS compressed archive without stored compressed sizes
    Lzs,
}

/// Platforms a format is known from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Pc,
    Ps2,
    Psp,
    Xbox,
    Wii,
}

/// Operations a format descriptor supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub read: bool,
    pub write: bool,
    pub replace: bool,
    pub rename: bool,
}

impl Capabilities {
    pub const READ_ONLY: Capabilities = Capabilities {
        read: true,
        write: false,
        replace: false,
        rename: false,
    };
}

/// Viewer suggested for a resource. Advisory only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewKind {
    Image,
    Audio,
    Text,
    Model,
    Hex,
}

/// Run-wide settings shared by every archive session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtraConfig {
    /// Window size of the accessor used for committed reads.
    pub buffer_size: usize,
    /// Window size of the accessor used while sniffing.
    pub probe_buffer_size: usize,
    /// Ceiling applied by `check_num_files`.
    pub max_files: u64,
    /// Encoding of stored filenames, `None` uses the format's default.
    pub archive_encoding: Option<Encoding>,
    /// Compression level used when a rebuild recompresses zlib data.
    pub zlib_level: u32,
    /// Guess extensions for resources of archives that store no names.
    pub guess_extensions: bool,
}

impl Default for ExtraConfig {
    fn default() -> Self {
        ExtraConfig {
            buffer_size: 64 * 1024,
            probe_buffer_size: 4 * 1024,
            max_files: crate::guards::DEFAULT_MAX_FILES,
            archive_encoding: None,
            zlib_level: 6,
            guess_extensions: true,
        }
    }
}

impl ExtraConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let data = crate::utils::files::read_file(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}
