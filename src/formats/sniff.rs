//! Confidence scoring and format detection.
use super::Registry;
use super::base::FormatDescriptor;
use crate::accessor::ArcReader;
use crate::error::ArcResult;
use crate::guards::check_extension;
use crate::types::ExtraConfig;
use std::path::Path;
use std::sync::Arc;

/// Accumulates points for independently plausible signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rating {
    score: u32,
}

impl Rating {
    pub const EXTENSION_MATCH: u32 = 25;
    pub const MAGIC_MATCH: u32 = 50;
    pub const CORROBORATING: u32 = 5;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn add(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Awards [`EXTENSION_MATCH`](Self::EXTENSION_MATCH) when the path's
    /// extension is one of `declared`.
    pub fn extension(&mut self, path: &Path, declared: &[&str]) -> bool {
        let matched = extension_matches(path, declared);
        if matched {
            self.add(Self::EXTENSION_MATCH);
        }
        matched
    }

    pub fn magic(&mut self, found: &[u8], expected: &[u8]) -> bool {
        let matched = found == expected;
        if matched {
            self.add(Self::MAGIC_MATCH);
        }
        matched
    }

    /// Magic compared as a signed 32-bit value.
    pub fn magic_i32(&mut self, found: i32, expected: i32) -> bool {
        let matched = found == expected;
        if matched {
            self.add(Self::MAGIC_MATCH);
        }
        matched
    }

    /// Awards [`CORROBORATING`](Self::CORROBORATING) when `plausible`.
    pub fn corroborate(&mut self, plausible: bool) -> bool {
        if plausible {
            self.add(Self::CORROBORATING);
        }
        plausible
    }
}

pub fn extension_matches(path: &Path, declared: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| check_extension(e, declared))
}

/// One descriptor's verdict on a candidate file.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub descriptor: Arc<dyn FormatDescriptor>,
    pub score: u32,
    pub extension_match: bool,
}

/// Runs every registered descriptor's `rate` against a file.
#[derive(Debug)]
pub struct Sniffer<'r> {
    registry: &'r Registry,
    window_size: usize,
}

impl<'r> Sniffer<'r> {
    pub fn new(registry: &'r Registry, config: &ExtraConfig) -> Self {
        Sniffer {
            registry,
            window_size: config.probe_buffer_size,
        }
    }

    /// Scores one descriptor. Any failure inside `rate` is a score of 0.
    pub fn rate_one(descriptor: &dyn FormatDescriptor, path: &Path, reader: &mut ArcReader) -> u32 {
        let score = reader
            .seek(0)
            .and_then(|_| descriptor.rate(path, reader));
        let _ = reader.seek(0);
        match score {
            Ok(score) => {
                tracing::trace!("{} rated {} at {}", path.display(), descriptor.name(), score);
                score
            }
            Err(e) => {
                tracing::trace!("{} is not {}: {}", path.display(), descriptor.name(), e);
                0
            }
        }
    }

    /// Scores every descriptor, best first. Equal scores prefer an
    /// extension match, then registry order.
    pub fn rate_all(&self, path: &Path) -> ArcResult<Vec<Candidate>> {
        let mut reader = ArcReader::open_with_window(path, self.window_size)?;
        let mut candidates: Vec<Candidate> = self
            .registry
            .descriptors()
            .iter()
            .map(|d| Candidate {
                descriptor: d.clone(),
                score: Self::rate_one(d.as_ref(), path, &mut reader),
                extension_match: extension_matches(path, d.extensions()),
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(b.extension_match.cmp(&a.extension_match))
        });
        Ok(candidates)
    }

    /// The best candidate with a positive score.
    pub fn best(&self, path: &Path) -> ArcResult<Option<Candidate>> {
        let best = self
            .rate_all(path)?
            .into_iter()
            .next()
            .filter(|c| c.score > 0);
        match &best {
            Some(c) => tracing::debug!(
                "Detected {} as {} (score {})",
                path.display(),
                c.descriptor.name(),
                c.score
            ),
            None => tracing::debug!("No format matched {}", path.display()),
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_accumulates() {
        let mut r = Rating::new();
        assert!(r.extension(Path::new("DATA.PAK"), &["pak"]));
        assert!(r.magic(b"PACK", b"PACK"));
        assert!(!r.magic(b"PACX", b"PACK"));
        assert!(r.magic_i32(-1, -1));
        assert!(r.corroborate(true));
        assert!(!r.corroborate(false));
        assert_eq!(
            r.score(),
            Rating::EXTENSION_MATCH + 2 * Rating::MAGIC_MATCH + Rating::CORROBORATING
        );
        assert!(!extension_matches(Path::new("noext"), &["pak"]));
    }
}
