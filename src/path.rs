//! # Identity & Paths
//!
//! Memories are addressed by hierarchical slug paths (`project/cortex/notes`),
//! not by opaque ids. This module owns parsing, validation, and normalization
//! of those identifiers and is deliberately pure: no filesystem, no clock.
//!
//! Three types:
//!
//! - [`Slug`]: a single lowercase path segment (`^[a-z0-9]+(?:-[a-z0-9]+)*$`).
//! - [`CategoryPath`]: zero or more slugs; the empty path is the root category.
//! - [`MemoryPath`]: a category path plus a leaf slug; never the root.
//!
//! Everything stored or exchanged by the engine goes through these types, so
//! uppercase letters, duplicate slashes, `..`, or OS separators can never
//! reach an index or a filename.

use crate::error::{CortexError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A single canonical path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slug(String);

impl Slug {
    /// Validate `input` as an already-canonical slug.
    ///
    /// Unlike [`Slug::normalize`], this rejects anything that is not already
    /// in canonical form. Use it for identifiers the caller claims are exact
    /// (store names, path segments from an index).
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(CortexError::InvalidSlug {
                input: input.to_string(),
                reason: "slug is empty".to_string(),
            });
        }
        let bytes = input.as_bytes();
        if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
            return Err(CortexError::InvalidSlug {
                input: input.to_string(),
                reason: "slug must not start or end with '-'".to_string(),
            });
        }
        let mut prev_dash = false;
        for &b in bytes {
            match b {
                b'a'..=b'z' | b'0'..=b'9' => prev_dash = false,
                b'-' => {
                    if prev_dash {
                        return Err(CortexError::InvalidSlug {
                            input: input.to_string(),
                            reason: "slug must not contain consecutive '-'".to_string(),
                        });
                    }
                    prev_dash = true;
                }
                _ => {
                    return Err(CortexError::InvalidSlug {
                        input: input.to_string(),
                        reason: format!(
                            "character '{}' is not allowed; use lowercase a-z, 0-9 and '-'",
                            char::from(b)
                        ),
                    });
                }
            }
        }
        Ok(Slug(input.to_string()))
    }

    /// Coerce arbitrary input into a canonical slug.
    ///
    /// Lowercases, maps whitespace and `_` to `-`, drops every other
    /// character outside `[a-z0-9-]`, collapses dash runs, and strips
    /// leading/trailing dashes. Input that collapses to nothing is an error.
    pub fn normalize(input: &str) -> Result<Self> {
        let mut out = String::with_capacity(input.len());
        for ch in input.chars() {
            let mapped = match ch {
                'a'..='z' | '0'..='9' => Some(ch),
                'A'..='Z' => Some(ch.to_ascii_lowercase()),
                '_' | '-' => Some('-'),
                c if c.is_whitespace() => Some('-'),
                _ => None,
            };
            if let Some(c) = mapped {
                if c == '-' && out.ends_with('-') {
                    continue;
                }
                out.push(c);
            }
        }
        let trimmed = out.trim_matches('-');
        if trimmed.is_empty() {
            return Err(CortexError::InvalidSlug {
                input: input.to_string(),
                reason: "nothing remains after normalization".to_string(),
            });
        }
        Ok(Slug(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self> {
        Slug::parse(s)
    }
}

/// An ordered sequence of slugs naming a category. Empty means root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CategoryPath {
    segments: Vec<Slug>,
}

impl CategoryPath {
    pub fn root() -> Self {
        CategoryPath {
            segments: Vec::new(),
        }
    }

    /// Parse a `/`-joined category path. The empty string is the root.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Ok(CategoryPath::root());
        }
        check_path_shape(input)?;
        let mut segments = Vec::new();
        for segment in input.split('/') {
            segments.push(Slug::parse(segment).map_err(|_| CortexError::InvalidPath {
                input: input.to_string(),
                reason: format!("segment '{segment}' is not a valid slug"),
            })?);
        }
        Ok(CategoryPath { segments })
    }

    pub fn from_segments(segments: Vec<Slug>) -> Self {
        CategoryPath { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Slug] {
        &self.segments
    }

    /// First segment, if any. Category-mode policy keys off this.
    pub fn root_segment(&self) -> Option<&Slug> {
        self.segments.first()
    }

    pub fn join(&self, slug: Slug) -> CategoryPath {
        let mut segments = self.segments.clone();
        segments.push(slug);
        CategoryPath { segments }
    }

    /// Parent category; `None` for the root.
    pub fn parent(&self) -> Option<CategoryPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(CategoryPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when `self` equals `prefix` or lives underneath it.
    pub fn starts_with(&self, prefix: &CategoryPath) -> bool {
        if prefix.segments.len() > self.segments.len() {
            return false;
        }
        self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Every ancestor from the first segment down to `self`, excluding root.
    pub fn ancestry(&self) -> Vec<CategoryPath> {
        (1..=self.segments.len())
            .map(|n| CategoryPath {
                segments: self.segments[..n].to_vec(),
            })
            .collect()
    }

    /// The category as a relative filesystem path under a store root.
    pub fn to_fs_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in &self.segments {
            path.push(segment.as_str());
        }
        path
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str("/")?;
            }
            f.write_str(segment.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for CategoryPath {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self> {
        CategoryPath::parse(s)
    }
}

/// A category path plus a leaf slug addressing one memory file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryPath {
    category: CategoryPath,
    leaf: Slug,
}

impl MemoryPath {
    /// Parse a `/`-joined memory path. At least one segment is required; a
    /// memory can never sit at the root itself, but a single-segment path
    /// names a memory directly under the root category.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(CortexError::InvalidPath {
                input: input.to_string(),
                reason: "memory path is empty".to_string(),
            });
        }
        check_path_shape(input)?;
        let (category_part, leaf_part) = match input.rfind('/') {
            Some(pos) => (&input[..pos], &input[pos + 1..]),
            None => ("", input),
        };
        let category = CategoryPath::parse(category_part)?;
        let leaf = Slug::parse(leaf_part).map_err(|_| CortexError::InvalidPath {
            input: input.to_string(),
            reason: format!("segment '{leaf_part}' is not a valid slug"),
        })?;
        Ok(MemoryPath { category, leaf })
    }

    pub fn new(category: CategoryPath, leaf: Slug) -> Self {
        MemoryPath { category, leaf }
    }

    pub fn split(&self) -> (&CategoryPath, &Slug) {
        (&self.category, &self.leaf)
    }

    pub fn parent(&self) -> &CategoryPath {
        &self.category
    }

    pub fn leaf(&self) -> &Slug {
        &self.leaf
    }

    pub fn starts_with(&self, prefix: &CategoryPath) -> bool {
        self.category.starts_with(prefix)
    }

    /// The memory's markdown file as a relative path under a store root.
    pub fn to_fs_path(&self) -> PathBuf {
        let mut path = self.category.to_fs_path();
        path.push(format!("{}.md", self.leaf));
        path
    }
}

impl fmt::Display for MemoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category.is_root() {
            f.write_str(self.leaf.as_str())
        } else {
            write!(f, "{}/{}", self.category, self.leaf)
        }
    }
}

impl FromStr for MemoryPath {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self> {
        MemoryPath::parse(s)
    }
}

/// Shape checks shared by both path parsers. Segment content is validated
/// separately by [`Slug::parse`]; this catches the structural cases with
/// clearer messages.
fn check_path_shape(input: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(CortexError::InvalidPath {
            input: input.to_string(),
            reason: reason.to_string(),
        })
    };
    if input.starts_with('/') || input.ends_with('/') {
        return reject("leading or trailing '/' is not allowed");
    }
    if input.contains("//") {
        return reject("empty segments are not allowed");
    }
    if input.contains('\\') {
        return reject("'\\' is not a path separator; use '/'");
    }
    if input.split('/').any(|s| s == "." || s == "..") {
        return reject("'.' and '..' segments are not allowed");
    }
    if input.len() >= 2 && input.as_bytes()[1] == b':' {
        return reject("drive-letter paths are not allowed");
    }
    Ok(())
}

impl Serialize for Slug {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Slug::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for CategoryPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CategoryPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CategoryPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for MemoryPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MemoryPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MemoryPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}
