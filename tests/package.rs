mod common;

use gamearc::archive::Archive;
use gamearc::formats::Registry;
use gamearc::progress::{CountingProgress, NoProgress};
use gamearc::resource::Replacement;
use gamearc::types::{ArchiveFormat, ExtraConfig};
use std::sync::Arc;

const ENTRIES: [(&str, &[u8]); 3] = [
    ("script/start.txt", b"Hello, world!\n"),
    ("bgm.ogg", b"OggS\x00\x02rest of the page"),
    ("empty.bin", b""),
];

fn open(path: &std::path::Path) -> Archive {
    Archive::open(path, &Registry::builtin(), ExtraConfig::default()).unwrap()
}

#[test]
fn test_read_three_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write(dir.path(), "data.pkg", &common::package(&ENTRIES));
    let archive = open(&path);
    assert_eq!(archive.format(), ArchiveFormat::Package);
    assert_eq!(archive.len(), 3);
    for (i, (name, data)) in ENTRIES.iter().enumerate() {
        let resource = &archive.resources()[i];
        assert_eq!(&resource.name, name);
        assert_eq!(resource.length, data.len() as u64);
        let mut out = Vec::new();
        archive.extract(i, &mut out).unwrap();
        assert_eq!(&out, data);
    }
    assert_eq!(archive.find("bgm.ogg"), Some(1));
}

#[test]
fn test_rebuild_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::package(&ENTRIES);
    let path = common::write(dir.path(), "data.pkg", &source);
    let archive = open(&path);
    let out = dir.path().join("rebuilt.pkg");
    let mut progress = CountingProgress::default();
    archive.write(&out, &mut progress).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), source);
    assert_eq!(progress.succeeded.len(), 3);
    assert!(progress.failed.is_empty());
}

#[test]
fn test_rebuild_with_replacement_and_rename() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write(dir.path(), "data.pkg", &common::package(&ENTRIES));
    let mut archive = open(&path);
    archive
        .set_replacement(0, Replacement::Bytes(Arc::from(&b"replaced"[..])))
        .unwrap();
    archive.rename(2, "renamed.bin").unwrap();
    assert!(archive.rename(1, "").is_err());
    archive.reorder(0, 1).unwrap();
    let out = dir.path().join("rebuilt.pkg");
    archive.write(&out, &mut NoProgress).unwrap();

    let rebuilt = open(&out);
    let names: Vec<_> = rebuilt.resources().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["bgm.ogg", "script/start.txt", "renamed.bin"]);
    let mut data = Vec::new();
    rebuilt.extract(1, &mut data).unwrap();
    assert_eq!(data, b"replaced");
}

#[test]
fn test_patch_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::package(&ENTRIES);
    let path = common::write(dir.path(), "data.pkg", &source);
    let mut archive = open(&path);
    let old = archive.resources()[0].clone();
    archive
        .set_replacement(0, Replacement::Bytes(Arc::from(&b"Hi"[..])))
        .unwrap();
    let out = dir.path().join("patched.pkg");
    archive.replace(&out, &mut NoProgress).unwrap();

    let patched = std::fs::read(&out).unwrap();
    assert_eq!(patched.len(), source.len());
    let at = old.offset as usize;
    assert_eq!(&patched[at..at + 2], b"Hi");
    // Everything past the rewritten bytes is untouched.
    assert_eq!(&patched[at + 2..], &source[at + 2..]);

    let reopened = open(&out);
    assert_eq!(reopened.resources()[0].offset, old.offset);
    assert_eq!(reopened.resources()[0].length, 2);
    let mut data = Vec::new();
    reopened.extract(1, &mut data).unwrap();
    assert_eq!(data, ENTRIES[1].1);
}

#[test]
fn test_patch_appends_larger_data() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::package(&ENTRIES);
    let path = common::write(dir.path(), "data.pkg", &source);
    let mut archive = open(&path);
    let bigger = vec![0x42u8; 64];
    archive
        .set_replacement(1, Replacement::Bytes(Arc::from(bigger.as_slice())))
        .unwrap();
    let out = dir.path().join("patched.pkg");
    archive.replace(&out, &mut NoProgress).unwrap();

    let patched = std::fs::read(&out).unwrap();
    assert_eq!(patched.len(), source.len() + 64);
    // Only the second entry's offset and length fields change.
    let entry = 16 + 12 + ENTRIES[0].0.len();
    assert_eq!(&patched[..entry], &source[..entry]);
    assert_eq!(&patched[entry + 8..source.len()], &source[entry + 8..]);
    assert_eq!(&patched[source.len()..], bigger.as_slice());
    let reopened = open(&out);
    assert_eq!(reopened.resources()[1].offset, source.len() as u64);
    let mut data = Vec::new();
    reopened.extract(1, &mut data).unwrap();
    assert_eq!(data, bigger);
}

#[test]
fn test_extract_all() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write(dir.path(), "data.pkg", &common::package(&ENTRIES));
    let archive = open(&path);
    let out = dir.path().join("out");
    let count = archive.extract_all(&out, &mut NoProgress).unwrap();
    assert_eq!(count, 3);
    assert_eq!(
        std::fs::read(out.join("script").join("start.txt")).unwrap(),
        ENTRIES[0].1
    );
    assert_eq!(std::fs::read(out.join("empty.bin")).unwrap(), b"");
}

#[test]
fn test_extensionless_names_survive_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let entries: [(&str, &[u8]); 2] = [("readme", b"plain text notes\n"), ("data.bin", b"\x00\x01\x02")];
    let source = common::package(&entries);
    let path = common::write(dir.path(), "notes.pkg", &source);
    let archive = open(&path);
    assert_eq!(archive.resources()[0].name, "readme");
    assert_eq!(archive.find("readme"), Some(0));

    let out = dir.path().join("rebuilt.pkg");
    archive.write(&out, &mut NoProgress).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), source);
}
