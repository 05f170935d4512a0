//! # Data Model
//!
//! Core records for the memory engine: [`Memory`] (metadata + markdown body),
//! the derived index projections ([`CategoryIndex`], [`CategoryIndexEntry`],
//! [`SubcategoryEntry`]), and the per-store [`CategoryMode`] policy tag.
//!
//! Memories are copy-semantic values. The index types are *projections*: they
//! can always be rebuilt from the memory files on disk and are never treated
//! as authoritative.

use crate::error::{CortexError, Result};
use crate::path::{CategoryPath, MemoryPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a subcategory description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Per-store policy for runtime category mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMode {
    /// Categories may be created and deleted freely.
    #[default]
    Free,
    /// New root categories are forbidden; nesting under existing roots is fine.
    Subcategories,
    /// No category creation or deletion at runtime; config defines the set.
    Strict,
}

impl std::fmt::Display for CategoryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CategoryMode::Free => "free",
            CategoryMode::Subcategories => "subcategories",
            CategoryMode::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Metadata block of a memory file.
///
/// `extra` holds frontmatter keys the engine does not interpret; they ride
/// along so a round-trip through the codec never loses user data.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub source: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub citations: Vec<String>,
    pub extra: serde_yaml::Mapping,
}

/// One memory: metadata plus an arbitrary UTF-8 markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub metadata: MemoryMetadata,
    pub content: String,
}

impl Memory {
    /// Build a new memory from caller input, stamping both timestamps with
    /// `now`. Tags are deduplicated (first occurrence wins) and validated.
    pub fn new(draft: MemoryDraft, now: DateTime<Utc>) -> Result<Self> {
        let now = truncate_to_millis(now);
        let tags = normalize_tags(draft.tags)?;
        let citations = normalize_citations(draft.citations)?;
        if draft.source.trim().is_empty() {
            return Err(CortexError::InvalidSource);
        }
        Ok(Memory {
            metadata: MemoryMetadata {
                created_at: now,
                updated_at: now,
                tags,
                source: draft.source,
                expires_at: draft.expires_at.map(truncate_to_millis),
                citations,
                extra: serde_yaml::Mapping::new(),
            },
            content: draft.content,
        })
    }

    /// A memory is expired iff it has an expiry and the expiry is not in the
    /// future.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.metadata.expires_at, Some(at) if at <= now)
    }

    /// Apply a patch, replacing the listed fields and stamping `updated_at`.
    /// `created_at` is never touched.
    pub fn apply(&mut self, patch: MemoryPatch, now: DateTime<Utc>) -> Result<()> {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.metadata.tags = normalize_tags(tags)?;
        }
        if let Some(citations) = patch.citations {
            self.metadata.citations = normalize_citations(citations)?;
        }
        match patch.expires_at {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => self.metadata.expires_at = None,
            FieldUpdate::Set(at) => self.metadata.expires_at = Some(truncate_to_millis(at)),
        }
        // updated_at is monotone per memory even under a skewed caller clock.
        self.metadata.updated_at = truncate_to_millis(now).max(self.metadata.updated_at);
        Ok(())
    }
}

/// Caller input for creating a memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraft {
    pub content: String,
    pub tags: Vec<String>,
    pub source: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub citations: Vec<String>,
}

/// Tri-state update for an optional field: keep it, clear it, or set it.
#[derive(Debug, Clone)]
pub enum FieldUpdate<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Keep
    }
}

/// Partial update for a memory. Omitted (`None`/`Keep`) fields preserve the
/// existing values; present fields replace entirely.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub citations: Option<Vec<String>>,
    pub expires_at: FieldUpdate<DateTime<Utc>>,
}

/// Per-memory row in the derived index.
///
/// Both index layouts persist the same logical row. `updated_at` is optional
/// because a reindex over a file with broken frontmatter still includes the
/// file, with whatever metadata could be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryIndexEntry {
    pub path: MemoryPath,
    pub token_estimate: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

fn default_source() -> String {
    "unknown".to_string()
}

impl CategoryIndexEntry {
    /// Project a memory into its index row.
    pub fn from_memory(path: &MemoryPath, memory: &Memory) -> Self {
        CategoryIndexEntry {
            path: path.clone(),
            token_estimate: token_estimate(&memory.content),
            tags: memory.metadata.tags.clone(),
            source: memory.metadata.source.clone(),
            created_at: Some(memory.metadata.created_at),
            updated_at: Some(memory.metadata.updated_at),
            expires_at: memory.metadata.expires_at,
            summary: summarize(&memory.content),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Per-subcategory row in a category's index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryEntry {
    pub path: CategoryPath,
    pub memory_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The index projection of one category: its direct memories and its direct
/// subcategories.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryIndex {
    #[serde(default)]
    pub memories: Vec<CategoryIndexEntry>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryEntry>,
}

impl CategoryIndex {
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty() && self.subcategories.is_empty()
    }
}

/// Coarse token count for context-budget displays. Deliberately cheap; this
/// is display data, not a correctness property.
pub fn token_estimate(content: &str) -> u64 {
    (content.chars().count() as u64 + 3) / 4
}

/// First non-blank body line, capped at 120 characters.
pub fn summarize(content: &str) -> Option<String> {
    let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(line.chars().take(120).collect())
}

/// Validate a description per the index contract: non-empty after trim,
/// at most [`MAX_DESCRIPTION_LEN`] characters.
pub fn validate_description(description: &str) -> Result<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(CortexError::DescriptionEmpty);
    }
    let len = trimmed.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(CortexError::DescriptionTooLong {
            len,
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Deduplicate tags preserving first-occurrence order; reject empty elements.
pub fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if tag.is_empty() {
            return Err(CortexError::InvalidTags {
                reason: "tags must be non-empty strings".to_string(),
            });
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    Ok(out)
}

fn normalize_citations(citations: Vec<String>) -> Result<Vec<String>> {
    for citation in &citations {
        if citation.trim().is_empty() {
            return Err(CortexError::InvalidTags {
                reason: "citations must be non-empty strings".to_string(),
            });
        }
    }
    Ok(citations)
}

/// Clamp a timestamp to millisecond precision.
///
/// Everything the engine stamps goes through this, so values survive the
/// frontmatter round-trip bit-for-bit.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    let millis = at.timestamp_millis();
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(at)
}
