//! Plausibility guards for values decoded from untrusted archives.
//!
//! The `check_*` predicates never fail; callers decide whether a `false`
//! aborts a speculative parse. The `ensure_*` forms turn a failed check
//! into [`ArcError::Implausible`] for use with `?` in committed reads.
use crate::error::{ArcError, ArcResult};

pub const DEFAULT_MAX_FILES: u64 = 100_000;
pub const MAX_FILENAME_LENGTH: i64 = 512;

/// `0 <= n <= DEFAULT_MAX_FILES`.
pub fn check_num_files(n: i64) -> bool {
    check_num_files_max(n, DEFAULT_MAX_FILES)
}

pub fn check_num_files_max(n: i64, max: u64) -> bool {
    n >= 0 && (n as u64) <= max
}

/// `0 <= value <= max`.
pub fn check_offset(value: i64, max: u64) -> bool {
    value >= 0 && (value as u64) <= max
}

/// `0 <= value`, and `value <= max` when a bound is given.
pub fn check_length(value: i64, max: Option<u64>) -> bool {
    value >= 0 && max.is_none_or(|m| (value as u64) <= m)
}

pub fn check_filename_length(len: i64) -> bool {
    len > 0 && len <= MAX_FILENAME_LENGTH
}

/// Rejects empty or overlong names and names with control characters.
pub fn check_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() as i64 <= MAX_FILENAME_LENGTH
        && !name.chars().any(|c| c.is_control())
}

/// Case-insensitive match against declared extensions. A leading dot on
/// either side is ignored.
pub fn check_extension(ext: &str, declared: &[&str]) -> bool {
    let ext = ext.trim_start_matches('.');
    declared
        .iter()
        .any(|d| d.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

pub fn check_equals<T: PartialEq>(value: T, expected: T) -> bool {
    value == expected
}

/// Inclusive range check.
pub fn check_range<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    value >= min && value <= max
}

pub fn ensure_num_files(n: i64, max: u64) -> ArcResult<u64> {
    if check_num_files_max(n, max) {
        Ok(n as u64)
    } else {
        Err(ArcError::implausible("numFiles", n))
    }
}

pub fn ensure_offset(value: i64, max: u64) -> ArcResult<u64> {
    if check_offset(value, max) {
        Ok(value as u64)
    } else {
        Err(ArcError::implausible("offset", value))
    }
}

pub fn ensure_length(value: i64, max: Option<u64>) -> ArcResult<u64> {
    if check_length(value, max) {
        Ok(value as u64)
    } else {
        Err(ArcError::implausible("length", value))
    }
}

pub fn ensure_filename_length(len: i64) -> ArcResult<u64> {
    if check_filename_length(len) {
        Ok(len as u64)
    } else {
        Err(ArcError::implausible("filenameLength", len))
    }
}

pub fn ensure_filename(name: &str) -> ArcResult<()> {
    if check_filename(name) {
        Ok(())
    } else {
        Err(ArcError::Mismatch {
            field: "filename",
            expected: "printable name".into(),
            found: format!("{:?}", name),
        })
    }
}

pub fn ensure_equals<T: PartialEq + std::fmt::Debug>(
    field: &'static str,
    value: T,
    expected: T,
) -> ArcResult<()> {
    if value == expected {
        Ok(())
    } else {
        Err(ArcError::Mismatch {
            field,
            expected: format!("{:?}", expected),
            found: format!("{:?}", value),
        })
    }
}

pub fn ensure_range(field: &'static str, value: i64, min: i64, max: i64) -> ArcResult<i64> {
    if check_range(value, min, max) {
        Ok(value)
    } else {
        Err(ArcError::implausible(field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_offset_boundaries() {
        let max = 1000;
        assert!(check_offset(0, max));
        assert!(check_offset(1000, max));
        assert!(!check_offset(1001, max));
        assert!(!check_offset(-1, max));
        assert!(check_length(0, Some(max)));
        assert!(check_length(1000, Some(max)));
        assert!(!check_length(1001, Some(max)));
        assert!(!check_length(-1, Some(max)));
        assert!(check_length(i64::MAX, None));
    }

    #[test]
    fn test_num_files() {
        assert!(check_num_files(0));
        assert!(check_num_files(DEFAULT_MAX_FILES as i64));
        assert!(!check_num_files(DEFAULT_MAX_FILES as i64 + 1));
        assert!(!check_num_files(-5));
        assert!(ensure_num_files(3, 2).is_err());
        assert_eq!(ensure_num_files(2, 2).unwrap(), 2);
    }

    #[test]
    fn test_filenames() {
        assert!(check_filename("data/bgm01.ogg"));
        assert!(check_filename("背景.png"));
        assert!(!check_filename(""));
        assert!(!check_filename("bad\u{1}name"));
        assert!(!check_filename(&"a".repeat(513)));
        assert!(check_filename_length(1));
        assert!(!check_filename_length(0));
        assert!(!check_filename_length(MAX_FILENAME_LENGTH + 1));
    }

    #[test]
    fn test_extension_and_equals() {
        assert!(check_extension("PAK", &["pak", "dat"]));
        assert!(check_extension(".dat", &["pak", "dat"]));
        assert!(!check_extension("pa", &["pak"]));
        assert!(check_equals(1u32, 1));
        assert!(ensure_equals("version", 2u32, 1).is_err());
        assert!(check_range(5, 5, 6));
        assert!(!check_range(7, 5, 6));
        assert_eq!(ensure_range("version", 6, 5, 6).unwrap(), 6);
        assert!(ensure_range("version", 4, 5, 6).is_err());
    }

    proptest! {
        #[test]
        fn prop_offset_iff_in_bounds(value in any::<i64>(), max in 0u64..=(i64::MAX as u64)) {
            prop_assert_eq!(check_offset(value, max), value >= 0 && value as u64 <= max);
        }

        #[test]
        fn prop_length_monotonic(value in 0i64..1_000_000, max in 0u64..1_000_000) {
            if check_length(value, Some(max)) {
                prop_assert!(check_length(value, Some(max + 1)));
                prop_assert!(value == 0 || check_length(value - 1, Some(max)));
            }
        }
    }
}
