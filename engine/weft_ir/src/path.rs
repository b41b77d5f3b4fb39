//! Dotted paths into the merged scope namespace.
//!
//! A [`ScopePath`] is where a binding's resolved value is exposed inside a
//! scope's `values` object (`form.value`, `myQuery.data`). Paths are parsed
//! from dotted text; purely numeric segments become list indices.

use std::fmt;

use serde::Serialize;

/// One segment of a path: an object key or a list index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSeg {
    /// Object key segment.
    Key(String),
    /// List index segment.
    Index(usize),
}

impl PathSeg {
    /// Create a key segment.
    #[inline]
    pub fn key(key: impl Into<String>) -> Self {
        PathSeg::Key(key.into())
    }
}

impl fmt::Display for PathSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSeg::Key(key) => write!(f, "{key}"),
            PathSeg::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// A non-empty dotted path at which a binding exposes its value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ScopePath(Vec<PathSeg>);

impl ScopePath {
    /// Build a path from segments. Empty paths are not representable in the
    /// document, so an empty input yields a single empty key.
    pub fn new(segments: Vec<PathSeg>) -> Self {
        if segments.is_empty() {
            ScopePath(vec![PathSeg::Key(String::new())])
        } else {
            ScopePath(segments)
        }
    }

    /// Parse a dotted path (`"form.value"`, `"rows.0.name"`). Numeric
    /// segments become indices.
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split('.')
            .map(|part| match part.parse::<usize>() {
                Ok(idx) => PathSeg::Index(idx),
                Err(_) => PathSeg::Key(part.to_owned()),
            })
            .collect();
        ScopePath::new(segments)
    }

    /// The path's segments.
    #[inline]
    pub fn segments(&self) -> &[PathSeg] {
        &self.0
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with slices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if `segments` starts with this whole path.
    pub fn is_prefix_of(&self, segments: &[PathSeg]) -> bool {
        segments.len() >= self.0.len() && self.0.iter().zip(segments).all(|(a, b)| a == b)
    }
}

impl From<&str> for ScopePath {
    fn from(text: &str) -> Self {
        ScopePath::parse(text)
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}
