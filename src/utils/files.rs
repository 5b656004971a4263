use crate::formats::ALL_EXTS;
use std::fs;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};

fn has_known_extension(path: &Path) -> bool {
    let file = match path.file_name() {
        Some(file) => file.to_string_lossy().to_lowercase(),
        None => return false,
    };
    ALL_EXTS
        .iter()
        .any(|ext| file.ends_with(&format!(".{}", ext)))
}

pub fn find_files(path: &Path, recursive: bool, no_ext_filter: bool) -> io::Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            let path = entry?.path();
            if path.is_file() && (no_ext_filter || has_known_extension(&path)) {
                result.push(path);
            } else if recursive && path.is_dir() {
                result.append(&mut find_files(&path, recursive, no_ext_filter)?);
            }
        }
    }
    result.sort();
    Ok(result)
}

/// Expands `path` into a list of candidate archives.
///
/// The returned flag is true when `path` was a directory.
pub fn collect_files(
    path: &str,
    recursive: bool,
    no_ext_filter: bool,
) -> io::Result<(Vec<PathBuf>, bool)> {
    let pa = Path::new(path);
    if pa.is_dir() {
        return Ok((find_files(pa, recursive, no_ext_filter)?, true));
    }
    if pa.is_file() {
        return Ok((vec![pa.to_path_buf()], false));
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("Path {} is neither a file nor a directory", pa.display()),
    ))
}

pub fn read_file<F: AsRef<Path> + ?Sized>(f: &F) -> io::Result<Vec<u8>> {
    let mut content = Vec::new();
    if f.as_ref() == Path::new("-") {
        io::stdin().read_to_end(&mut content)?;
    } else {
        content = fs::read(f)?;
    }
    Ok(content)
}

pub fn make_sure_dir_exists<F: AsRef<Path> + ?Sized>(f: &F) -> io::Result<()> {
    let path = f.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Finds a file beside `path` with the same stem and extension `ext`,
/// ignoring case.
pub fn find_sibling(path: &Path, ext: &str) -> Option<PathBuf> {
    let exact = path.with_extension(ext);
    if exact.is_file() && exact != path {
        return Some(exact);
    }
    let stem = path.file_stem()?.to_string_lossy().to_lowercase();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut found: Vec<PathBuf> = fs::read_dir(&dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_name() != path.file_name())
        .filter(|p| {
            p.file_stem()
                .is_some_and(|s| s.to_string_lossy().to_lowercase() == stem)
                && p.extension()
                    .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        })
        .collect();
    found.sort();
    found.into_iter().next()
}

/// Joins a resource name onto `base`, refusing names that would escape it.
pub fn safe_join(base: &Path, name: &str) -> io::Result<PathBuf> {
    let mut out = base.to_path_buf();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("resource name '{}' escapes the output directory", name),
                ));
            }
            part if part.contains(':') => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("resource name '{}' contains a drive prefix", name),
                ));
            }
            part => out.push(part),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_join() {
        let base = Path::new("out");
        assert_eq!(
            safe_join(base, "data\\bgm/01.ogg").unwrap(),
            Path::new("out").join("data").join("bgm").join("01.ogg")
        );
        assert!(safe_join(base, "../etc/passwd").is_err());
        assert!(safe_join(base, "C:/x").is_err());
    }

    #[test]
    fn test_find_sibling_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let pak = dir.path().join("data.pak");
        std::fs::write(&pak, b"x").unwrap();
        std::fs::write(dir.path().join("DATA.DIR"), b"y").unwrap();
        assert_eq!(find_sibling(&pak, "dir"), Some(dir.path().join("DATA.DIR")));
        assert_eq!(find_sibling(&pak, "idx"), None);
    }
}
