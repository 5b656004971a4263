#![allow(dead_code)]

use gamearc::exporter::Exporter;
use gamearc::exporter::lzss::LzssExporter;
use std::path::{Path, PathBuf};

/// Lays out a `package` archive the same way the rebuild path does.
pub fn package(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let dir_len: usize = entries.iter().map(|(name, _)| 12 + name.len()).sum();
    let mut offset = 16 + dir_len;
    let mut out = Vec::new();
    out.extend_from_slice(b"package\0");
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (name, data) in entries {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u32).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        offset += data.len();
    }
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// "ABC" as literals followed by a six byte back-reference.
pub const ABC_STREAM: [u8; 6] = [0x07, b'A', b'B', b'C', 0xEE, 0xF3];

/// Builds an `lzs` archive from already compressed entries.
pub fn lzs(entries: &[(&str, Vec<u8>, u32)]) -> Vec<u8> {
    let dir_len: usize = entries.iter().map(|(name, _, _)| name.len() + 1 + 8).sum();
    let mut offset = 6 + dir_len;
    let mut out = Vec::new();
    out.extend_from_slice(b"LZS\x1a");
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (name, data, decompressed) in entries {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(&decompressed.to_le_bytes());
        offset += data.len();
    }
    for (_, data, _) in entries {
        out.extend_from_slice(data);
    }
    out
}

pub fn lzss_pack(data: &[u8]) -> Vec<u8> {
    LzssExporter.pack(data).unwrap()
}

/// One 40-byte `.dir` record.
pub fn dir_record(name: &str, offset: u32, length: u32) -> Vec<u8> {
    let mut out = vec![0u8; 32];
    out[..name.len()].copy_from_slice(name.as_bytes());
    for b in out.iter_mut() {
        *b ^= 0x5A;
    }
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&length.to_le_bytes());
    out
}

pub fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}
