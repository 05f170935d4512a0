//! # Storage Layer
//!
//! Narrow, single-concern I/O ports plus the implementations that back them.
//! Nothing in this module knows about category modes, protected categories,
//! or any other business rule — that is the command layer's job.
//!
//! ## Architecture: files are truth
//!
//! The memory files on disk are the authoritative state. The index (SQLite
//! or legacy per-category YAML) is a derived projection: losing it, or
//! finding it stale after a crash, is a latency problem, never a correctness
//! problem, because [`IndexStore::reindex`] rebuilds it from a filesystem
//! walk. `reindex` is the only operation allowed to delete derived state.
//!
//! ## Ports
//!
//! - [`MemoryStore`]: memory files (load/add/save/remove/rename).
//! - [`IndexStore`]: the derived projection (surgical upserts, queries,
//!   rebuild).
//! - [`CategoryStore`]: category directories and their index entries.
//! - [`StoreRegistry`] / [`ConfigStore`]: the named-store registry persisted
//!   in the config file.
//!
//! A [`ScopedAdapter`] bundles the first three, bound to one store root,
//! together with the policy inputs (category mode, protected set) the
//! command layer enforces.
//!
//! ## Implementations
//!
//! - [`fs::FsMemoryStore`]: production memory files, atomic-rename writes.
//! - [`sqlite`]: preferred index layout, one `cortex.db` in WAL mode.
//! - [`yaml`]: legacy layout, one `index.yaml` per non-empty category.
//!   No inter-process locking; concurrent writers can race, and `reindex`
//!   is the recovery path.
//! - [`mem`]: in-memory implementations of all three scoped ports, for
//!   testing logic without filesystem I/O.

use crate::config::{IndexLayout, Settings, StoreDefinition};
use crate::error::Result;
use crate::model::{
    truncate_to_millis, CategoryIndex, CategoryIndexEntry, CategoryMode, Memory,
};
use crate::path::{CategoryPath, MemoryPath, Slug};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub mod fs;
pub mod mem;
pub mod sqlite;
pub mod walk;
pub mod yaml;

/// Durable I/O for memory files.
pub trait MemoryStore: Send + Sync {
    fn load(&self, path: &MemoryPath) -> Result<Memory>;

    fn exists(&self, path: &MemoryPath) -> Result<bool>;

    /// Create a memory; fails with `MEMORY_ALREADY_EXISTS` if present.
    fn add(&self, path: &MemoryPath, memory: &Memory) -> Result<()>;

    /// Upsert a memory.
    fn save(&self, path: &MemoryPath, memory: &Memory) -> Result<()>;

    /// Remove a memory file. A no-op when absent; callers that need a
    /// not-found error check existence first.
    fn remove(&self, path: &MemoryPath) -> Result<()>;

    /// Move a memory file. Best-effort atomic: rename where the platform
    /// allows, otherwise copy+delete with rollback on failure.
    fn rename(&self, src: &MemoryPath, dst: &MemoryPath) -> Result<()>;
}

/// Outcome of a reindex walk.
#[derive(Debug, Default)]
pub struct ReindexReport {
    /// Memories included in the rebuilt index.
    pub indexed: usize,
    /// Categories present in the rebuilt index.
    pub categories: usize,
    /// Files skipped or degraded, with reasons.
    pub warnings: Vec<String>,
}

/// Durable I/O for the derived index.
pub trait IndexStore: Send + Sync {
    /// Read one category's projection. Absent categories read as empty.
    fn load(&self, category: &CategoryPath) -> Result<CategoryIndex>;

    /// Overwrite one category's projection.
    fn write(&self, category: &CategoryPath, index: &CategoryIndex) -> Result<()>;

    /// Rebuild the projection under `scope` from the filesystem ground
    /// truth. Idempotent; removes stale derived state.
    fn reindex(&self, scope: &CategoryPath) -> Result<ReindexReport>;

    /// Upsert the memory's row. When `create_when_missing`, also ensure
    /// every ancestor category has a subcategory entry in its parent.
    /// Never modifies descriptions.
    fn update_after_memory_write(
        &self,
        path: &MemoryPath,
        memory: &Memory,
        create_when_missing: bool,
    ) -> Result<()>;

    /// Remove the memory's row. Categories left with no memories and no
    /// subcategories lose their entry in the parent, recursively up to root.
    /// Directories are untouched; only the projection changes.
    fn remove_entry(&self, path: &MemoryPath) -> Result<()>;

    /// Drop the projection of `category` and everything under it.
    fn remove_category(&self, category: &CategoryPath) -> Result<()>;

    /// Return entries matching `filter`, ordered per [`QueryFilter`].
    fn query(&self, filter: &QueryFilter) -> Result<Vec<CategoryIndexEntry>>;
}

/// Durable I/O for category directories and their index entries.
pub trait CategoryStore: Send + Sync {
    fn exists(&self, path: &CategoryPath) -> Result<bool>;

    /// Create the category (and missing ancestors). Idempotent; returns
    /// `true` when the leaf directory was actually created.
    fn ensure(&self, path: &CategoryPath) -> Result<bool>;

    /// True when the category holds no memories and no subcategories,
    /// judged from the filesystem.
    fn is_empty(&self, path: &CategoryPath) -> Result<bool>;

    /// Delete the category directory. Fails with `CATEGORY_NOT_EMPTY` when
    /// non-empty and `recursive` is false.
    fn delete(&self, path: &CategoryPath, recursive: bool) -> Result<()>;

    /// Set the description on `parent`'s entry for `child`.
    fn update_subcategory_description(
        &self,
        parent: &CategoryPath,
        child: &Slug,
        description: &str,
    ) -> Result<()>;

    /// Drop `parent`'s entry for `child` from the index projection.
    fn remove_subcategory_entry(&self, parent: &CategoryPath, child: &Slug) -> Result<()>;
}

/// The named-store registry persisted in the config file.
pub trait StoreRegistry: Send + Sync {
    fn load(&self, name: &Slug) -> Result<StoreDefinition>;

    /// Register a store; fails with `STORE_ALREADY_EXISTS` on duplicates.
    fn add(&mut self, name: &Slug, definition: StoreDefinition) -> Result<()>;

    /// Upsert a store definition.
    fn save(&mut self, name: &Slug, definition: StoreDefinition) -> Result<()>;

    fn remove(&mut self, name: &Slug) -> Result<()>;

    fn list(&self) -> Result<Vec<(Slug, StoreDefinition)>>;
}

/// Read access to the config file as an immutable snapshot.
pub trait ConfigStore: Send + Sync {
    /// Create the config directory and an empty config file when absent.
    /// Idempotent.
    fn initialize(&mut self) -> Result<()>;

    fn settings(&self) -> Result<Settings>;

    fn store(&self, name: &Slug) -> Result<StoreDefinition>;

    fn store_names(&self) -> Result<Vec<Slug>>;
}

/// Sort key for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    UpdatedAt,
    CreatedAt,
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Composable filter over index entries. Fields are conjunctive; `tags` is
/// an OR-match within itself. The time range is half-open:
/// `updated_after <= updated_at < updated_before`.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    /// Restrict to this category and its transitive descendants.
    pub category: Option<CategoryPath>,
    pub tags: Vec<String>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    pub include_expired: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
    /// Expiry is judged against this instant.
    pub now: DateTime<Utc>,
}

impl QueryFilter {
    pub fn at(now: DateTime<Utc>) -> Self {
        QueryFilter {
            category: None,
            tags: Vec::new(),
            updated_after: None,
            updated_before: None,
            include_expired: false,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            limit: None,
            offset: 0,
            now: truncate_to_millis(now),
        }
    }

    fn matches(&self, entry: &CategoryIndexEntry) -> bool {
        if let Some(category) = &self.category {
            if !entry.path.starts_with(category) {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| entry.tags.contains(t)) {
            return false;
        }
        if let Some(after) = self.updated_after {
            match entry.updated_at {
                Some(at) if at >= after => {}
                _ => return false,
            }
        }
        if let Some(before) = self.updated_before {
            match entry.updated_at {
                Some(at) if at < before => {}
                _ => return false,
            }
        }
        if !self.include_expired && entry.is_expired(self.now) {
            return false;
        }
        true
    }
}

/// Filter, order, and paginate entries. Shared by every index layout so the
/// ordering contract cannot drift between them: primary key per `sort_by`
/// (entries missing the key sort last in either order), ties broken by path
/// ascending.
pub fn apply_filter(
    mut entries: Vec<CategoryIndexEntry>,
    filter: &QueryFilter,
) -> Vec<CategoryIndexEntry> {
    entries.retain(|e| filter.matches(e));

    let descending = filter.sort_order == SortOrder::Desc;
    entries.sort_by(|a, b| {
        let primary = match filter.sort_by {
            SortBy::Path => Some(a.path.to_string().cmp(&b.path.to_string())),
            SortBy::UpdatedAt => compare_optional(a.updated_at, b.updated_at, descending),
            SortBy::CreatedAt => compare_optional(a.created_at, b.created_at, descending),
        };
        let primary = match primary {
            Some(ord) if descending => ord.reverse(),
            Some(ord) => ord,
            // Both keys missing; fall through to the path tie-break.
            None => std::cmp::Ordering::Equal,
        };
        primary.then_with(|| a.path.to_string().cmp(&b.path.to_string()))
    });

    entries
        .into_iter()
        .skip(filter.offset)
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect()
}

/// Compare optional sort keys so that `None` lands last regardless of the
/// requested order. Returns the ordering to apply *before* any reversal, or
/// `None` when both sides are missing.
fn compare_optional(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
    descending: bool,
) -> Option<std::cmp::Ordering> {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        (None, None) => None,
        // A missing key must sort last even after a descending reversal.
        (Some(_), None) => Some(if descending { Ordering::Greater } else { Ordering::Less }),
        (None, Some(_)) => Some(if descending { Ordering::Less } else { Ordering::Greater }),
    }
}

/// All ports for one store root, plus the policy inputs the command layer
/// needs. Commands take this by reference and never retain it.
pub struct ScopedAdapter {
    root: PathBuf,
    mode: CategoryMode,
    protected: Vec<CategoryPath>,
    label: String,
    memories: Box<dyn MemoryStore>,
    index: Box<dyn IndexStore>,
    categories: Box<dyn CategoryStore>,
}

impl ScopedAdapter {
    /// Bind filesystem-backed ports to `root` per the store definition.
    pub fn open(root: impl Into<PathBuf>, definition: &StoreDefinition, label: &str) -> Self {
        let root = root.into();
        let memories = Box::new(fs::FsMemoryStore::new(root.clone()));
        let (index, categories): (Box<dyn IndexStore>, Box<dyn CategoryStore>) =
            match definition.index_layout {
                IndexLayout::Sqlite => (
                    Box::new(sqlite::SqliteIndexStore::new(root.clone())),
                    Box::new(sqlite::SqliteCategoryStore::new(root.clone())),
                ),
                IndexLayout::Yaml => (
                    Box::new(yaml::YamlIndexStore::new(root.clone())),
                    Box::new(yaml::YamlCategoryStore::new(root.clone())),
                ),
            };
        ScopedAdapter {
            root,
            mode: definition.category_mode,
            protected: definition.protected_categories(),
            label: label.to_string(),
            memories,
            index,
            categories,
        }
    }

    /// In-memory adapter for tests: same contracts, no I/O.
    pub fn in_memory(mode: CategoryMode, protected: Vec<CategoryPath>) -> Self {
        let state = mem::MemState::shared();
        ScopedAdapter {
            root: PathBuf::from("/virtual"),
            mode,
            protected,
            label: "memory".to_string(),
            memories: Box::new(mem::MemMemoryStore::new(state.clone())),
            index: Box::new(mem::MemIndexStore::new(state.clone())),
            categories: Box::new(mem::MemCategoryStore::new(state)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> CategoryMode {
        self.mode
    }

    /// Scope label from resolution (`local`, `memory`, or the store name).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn memories(&self) -> &dyn MemoryStore {
        self.memories.as_ref()
    }

    pub fn index(&self) -> &dyn IndexStore {
        self.index.as_ref()
    }

    pub fn categories(&self) -> &dyn CategoryStore {
        self.categories.as_ref()
    }

    /// True when `path` or an ancestor is declared in the store config.
    pub fn is_protected(&self, path: &CategoryPath) -> bool {
        self.protected.iter().any(|p| p == path)
    }

    /// Config-declared category paths, for mode policy checks.
    pub fn protected_categories(&self) -> &[CategoryPath] {
        &self.protected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(path: &str, updated: Option<i64>) -> CategoryIndexEntry {
        CategoryIndexEntry {
            path: MemoryPath::parse(path).unwrap(),
            token_estimate: 1,
            tags: Vec::new(),
            source: "user".into(),
            created_at: updated.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            updated_at: updated.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            expires_at: None,
            summary: None,
        }
    }

    fn filter() -> QueryFilter {
        QueryFilter::at(Utc.timestamp_opt(1_000_000, 0).unwrap())
    }

    #[test]
    fn desc_sort_newest_first_ties_on_path() {
        let entries = vec![entry("b/x", Some(10)), entry("a/x", Some(10)), entry("c/x", Some(20))];
        let out = apply_filter(entries, &filter());
        let paths: Vec<String> = out.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["c/x", "a/x", "b/x"]);
    }

    #[test]
    fn missing_updated_at_sorts_last_in_both_orders() {
        let entries = vec![entry("a/stale", None), entry("a/fresh", Some(10))];
        let desc = apply_filter(entries.clone(), &filter());
        assert_eq!(desc.last().unwrap().path.to_string(), "a/stale");

        let mut asc = filter();
        asc.sort_order = SortOrder::Asc;
        let asc = apply_filter(entries, &asc);
        assert_eq!(asc.last().unwrap().path.to_string(), "a/stale");
    }

    #[test]
    fn category_restricts_to_descendants() {
        let entries = vec![entry("a/x", Some(1)), entry("a/b/y", Some(2)), entry("ab/z", Some(3))];
        let mut f = filter();
        f.category = Some(CategoryPath::parse("a").unwrap());
        let out = apply_filter(entries, &f);
        let paths: Vec<String> = out.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["a/b/y", "a/x"]);
    }

    #[test]
    fn tags_are_or_matched() {
        let mut tagged = entry("a/x", Some(1));
        tagged.tags = vec!["rust".into()];
        let entries = vec![tagged, entry("a/y", Some(2))];
        let mut f = filter();
        f.tags = vec!["rust".into(), "other".into()];
        let out = apply_filter(entries, &f);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "a/x");
    }

    #[test]
    fn time_range_is_half_open() {
        let entries = vec![entry("a/p", Some(10)), entry("a/q", Some(20)), entry("a/r", Some(30))];
        let mut f = filter();
        f.updated_after = Some(Utc.timestamp_opt(20, 0).unwrap());
        f.updated_before = Some(Utc.timestamp_opt(30, 0).unwrap());
        let out = apply_filter(entries, &f);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "a/q");
    }

    #[test]
    fn expired_entries_are_hidden_by_default() {
        let mut expired = entry("a/old", Some(1));
        expired.expires_at = Some(Utc.timestamp_opt(5, 0).unwrap());
        let entries = vec![expired, entry("a/new", Some(2))];

        let out = apply_filter(entries.clone(), &filter());
        assert_eq!(out.len(), 1);

        let mut f = filter();
        f.include_expired = true;
        assert_eq!(apply_filter(entries, &f).len(), 2);
    }

    #[test]
    fn offset_and_limit_paginate() {
        let entries = vec![entry("a/p", Some(1)), entry("a/q", Some(2)), entry("a/r", Some(3))];
        let mut f = filter();
        f.sort_order = SortOrder::Asc;
        f.offset = 1;
        f.limit = Some(1);
        let out = apply_filter(entries, &f);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "a/q");
    }
}
