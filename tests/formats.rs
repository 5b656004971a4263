mod common;

use gamearc::accessor::ArcWriter;
use gamearc::archive::Archive;
use gamearc::formats::zpack::ZpackDescriptor;
use gamearc::formats::{FormatDescriptor, Registry};
use gamearc::progress::{CountingProgress, NoProgress};
use gamearc::types::{ArchiveFormat, ExtraConfig};

fn open(path: &std::path::Path) -> Archive {
    Archive::open(path, &Registry::builtin(), ExtraConfig::default()).unwrap()
}

fn content(archive: &Archive, index: usize) -> Vec<u8> {
    let mut out = Vec::new();
    archive.extract(index, &mut out).unwrap();
    out
}

fn zpack_source() -> Vec<(&'static str, Vec<u8>)> {
    let big: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 251) as u8).collect();
    vec![
        ("small.txt", b"tiny".to_vec()),
        ("big.bin", big),
        ("exact.bin", vec![0x11; 4096]),
        ("nothing", Vec::new()),
    ]
}

#[test]
fn test_zpack_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let entries = zpack_source();
    let borrowed: Vec<(&str, &[u8])> = entries.iter().map(|(n, d)| (*n, d.as_slice())).collect();
    let pkg = common::write(dir.path(), "src.pkg", &common::package(&borrowed));
    let source = open(&pkg);

    let zpk = dir.path().join("out.zpk");
    let mut writer = ArcWriter::create(&zpk).unwrap();
    ZpackDescriptor::new()
        .write(source.session(), source.resources(), &mut writer, &mut NoProgress)
        .unwrap();
    writer.finish().unwrap();

    let archive = open(&zpk);
    assert_eq!(archive.format(), ArchiveFormat::Zpack);
    assert_eq!(archive.len(), entries.len());
    for (i, (name, data)) in entries.iter().enumerate() {
        let resource = &archive.resources()[i];
        assert_eq!(resource.name, *name);
        assert!(resource.is_compressed());
        assert_eq!(resource.decompressed_length, data.len() as u64);
        assert_eq!(&content(&archive, i), data);
    }

    // Rebuilding the rebuilt archive reproduces it exactly.
    let again = dir.path().join("again.zpk");
    archive.write(&again, &mut NoProgress).unwrap();
    assert_eq!(std::fs::read(&again).unwrap(), std::fs::read(&zpk).unwrap());
}

#[test]
fn test_zpack_rejects_patch() {
    let dir = tempfile::tempdir().unwrap();
    let entries: [(&str, &[u8]); 1] = [("a.txt", b"abc")];
    let pkg = common::write(dir.path(), "src.pkg", &common::package(&entries));
    let source = open(&pkg);
    let zpk = dir.path().join("out.zpk");
    let mut writer = ArcWriter::create(&zpk).unwrap();
    ZpackDescriptor::new()
        .write(source.session(), source.resources(), &mut writer, &mut NoProgress)
        .unwrap();
    writer.finish().unwrap();
    let archive = open(&zpk);
    assert!(archive.replace(dir.path().join("x.zpk"), &mut NoProgress).is_err());
    assert!(!dir.path().join("x.zpk").exists());
}

#[test]
fn test_lzs_measures_compressed_lengths() {
    let dir = tempfile::tempdir().unwrap();
    let hello = common::lzss_pack(b"hello world");
    let data = common::lzs(&[
        ("hello.txt", hello.clone(), 11),
        ("abc.bin", common::ABC_STREAM.to_vec(), 9),
    ]);
    let path = common::write(dir.path(), "DATA.LZS", &data);
    let archive = open(&path);
    assert_eq!(archive.format(), ArchiveFormat::Lzs);
    assert_eq!(archive.resources()[0].length, hello.len() as u64);
    assert_eq!(archive.resources()[1].length, 6);
    assert_eq!(content(&archive, 0), b"hello world");
    assert_eq!(content(&archive, 1), b"ABCABCABC");
}

#[test]
fn test_extract_all_skips_broken_resource() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::lzs(&[
        ("good.txt", common::lzss_pack(b"fine"), 4),
        ("broken.bin", vec![0xFF, b'x', b'y'], 100),
    ]);
    let path = common::write(dir.path(), "broken.lzs", &data);
    let archive = open(&path);
    // The short stream could not be measured, so it runs to the end.
    let last = &archive.resources()[1];
    assert_eq!(last.offset + last.length, data.len() as u64);

    let out = dir.path().join("out");
    let mut progress = CountingProgress::default();
    let count = archive.extract_all(&out, &mut progress).unwrap();
    assert_eq!(count, 1);
    assert_eq!(progress.failed, ["broken.bin"]);
    assert_eq!(std::fs::read(out.join("good.txt")).unwrap(), b"fine");
    assert!(!out.join("broken.bin").exists());
}

#[test]
fn test_lzs_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::lzs(&[("a.txt", common::lzss_pack(b"a"), 1)]);
    let path = common::write(dir.path(), "a.lzs", &data);
    let mut archive = open(&path);
    assert!(archive.rename(0, "b.txt").is_err());
    assert!(archive.write(dir.path().join("b.lzs"), &mut NoProgress).is_err());
}

#[test]
fn test_dirpak_finds_sibling_with_other_case() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = common::dir_record("title.png", 0, 5);
    index.extend(common::dir_record("voice/001.ogg", 5, 7));
    common::write(dir.path(), "GAME.DIR", &index);
    let pak = common::write(dir.path(), "game.pak", b"12345abcdefg");

    let archive = open(&pak);
    assert_eq!(archive.format(), ArchiveFormat::DirPak);
    assert_eq!(archive.len(), 2);
    assert_eq!(archive.resources()[1].name, "voice/001.ogg");
    assert_eq!(archive.resources()[1].source, pak);
    assert_eq!(content(&archive, 0), b"12345");
    assert_eq!(content(&archive, 1), b"abcdefg");
}

#[test]
fn test_dirpak_opened_from_index() {
    let dir = tempfile::tempdir().unwrap();
    let index = common::dir_record("only.bin", 0, 3);
    let idx = common::write(dir.path(), "set.dir", &index);
    common::write(dir.path(), "set.pak", b"xyz");
    let archive = open(&idx);
    assert_eq!(archive.format(), ArchiveFormat::DirPak);
    assert_eq!(content(&archive, 0), b"xyz");
}

#[test]
fn test_dirpak_without_pair_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let pak = common::write(dir.path(), "lonely.pak", b"12345");
    assert!(Archive::open(&pak, &Registry::builtin(), ExtraConfig::default()).is_err());
}
