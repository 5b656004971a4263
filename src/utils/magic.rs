//! Extension guessing from well-known content signatures.
use crate::formats::HeaderSample;
use crate::types::PreviewKind;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "png"),
    (b"\xFF\xD8\xFF", "jpg"),
    (b"GIF87a", "gif"),
    (b"GIF89a", "gif"),
    (b"DDS ", "dds"),
    (b"OggS", "ogg"),
    (b"fLaC", "flac"),
    (b"ID3", "mp3"),
    (b"%PDF", "pdf"),
    (b"PK\x03\x04", "zip"),
    (b"\xEF\xBB\xBF", "txt"),
    (b"\xFF\xFE", "txt"),
];

/// Guesses an extension from the first bytes of a resource.
pub fn guess_extension(sample: &HeaderSample) -> Option<&'static str> {
    if let Some((_, ext)) = SIGNATURES.iter().find(|(magic, _)| sample.starts_with(magic)) {
        return Some(*ext);
    }
    let bytes = &sample.bytes;
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") {
        return match &bytes[8..12] {
            b"WAVE" => Some("wav"),
            b"WEBP" => Some("webp"),
            b"AVI " => Some("avi"),
            _ => None,
        };
    }
    // BM, then the file size and two reserved zero shorts.
    if sample.starts_with(b"BM") && sample.shorts[3] == 0 && sample.shorts[4] == 0 && bytes.len() >= 14 {
        return Some("bmp");
    }
    if !bytes.is_empty()
        && bytes
            .iter()
            .all(|&b| b == b'\t' || b == b'\r' || b == b'\n' || (0x20..0x7F).contains(&b))
    {
        return Some("txt");
    }
    None
}

/// Suggested viewer for a file extension.
pub fn preview_for_extension(ext: &str) -> Option<PreviewKind> {
    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "dds" | "tga" | "webp" => Some(PreviewKind::Image),
        "ogg" | "wav" | "mp3" | "flac" => Some(PreviewKind::Audio),
        "txt" | "ini" | "xml" | "json" | "csv" => Some(PreviewKind::Text),
        "obj" | "fbx" | "mdl" => Some(PreviewKind::Model),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_signatures() {
        let png = HeaderSample::new(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec());
        assert_eq!(guess_extension(&png), Some("png"));
        let wav = HeaderSample::new(b"RIFF\x24\0\0\0WAVEfmt ".to_vec());
        assert_eq!(guess_extension(&wav), Some("wav"));
        let bmp = HeaderSample::new(b"BM\x36\x00\x0c\x00\0\0\0\0\x36\0\0\0".to_vec());
        assert_eq!(guess_extension(&bmp), Some("bmp"));
        let text = HeaderSample::new(b"hello, world\r\n".to_vec());
        assert_eq!(guess_extension(&text), Some("txt"));
        let blob = HeaderSample::new(vec![0, 1, 2, 3, 0xFE]);
        assert_eq!(guess_extension(&blob), None);
        assert_eq!(guess_extension(&HeaderSample::new(Vec::new())), None);
    }

    #[test]
    fn test_preview_kinds() {
        assert_eq!(preview_for_extension("PNG"), Some(PreviewKind::Image));
        assert_eq!(preview_for_extension("ogg"), Some(PreviewKind::Audio));
        assert_eq!(preview_for_extension("bin"), None);
    }
}
