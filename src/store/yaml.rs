//! Legacy YAML index layout: one `index.yaml` per non-empty category, plus
//! the root.
//!
//! This layout predates the SQLite index and is kept for stores that have
//! not migrated. It has no inter-process locking: two writers touching the
//! same `index.yaml` can race, and the recovery path for any resulting
//! staleness is [`IndexStore::reindex`]. New stores should prefer the
//! SQLite layout.
//!
//! Descriptions live in the *parent* category's `subcategories` entries,
//! which is why the category store and the index store of this layout share
//! their file helpers.
//!
//! [`IndexStore::reindex`]: crate::store::IndexStore::reindex

use crate::error::{CortexError, Result};
use crate::model::{CategoryIndex, CategoryIndexEntry, Memory, SubcategoryEntry};
use crate::path::{CategoryPath, MemoryPath, Slug};
use crate::store::fs::{write_atomic, DirCategoryOps};
use crate::store::walk;
use crate::store::{apply_filter, CategoryStore, IndexStore, QueryFilter, ReindexReport};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INDEX_FILENAME: &str = "index.yaml";

fn index_file(root: &Path, category: &CategoryPath) -> PathBuf {
    root.join(category.to_fs_path()).join(INDEX_FILENAME)
}

fn read_index(root: &Path, category: &CategoryPath) -> Result<CategoryIndex> {
    let file = index_file(root, category);
    let raw = match fs::read_to_string(&file) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CategoryIndex::default())
        }
        Err(e) => return Err(CortexError::storage(file, e)),
    };
    serde_yaml::from_str(&raw)
        .map_err(|e| CortexError::index(format!("malformed index at '{}'", file.display()), e))
}

/// Persist one category's projection. An empty projection deletes the file
/// (except at the root, which always keeps one once written).
fn write_index(root: &Path, category: &CategoryPath, index: &CategoryIndex) -> Result<()> {
    let file = index_file(root, category);
    if index.is_empty() && !category.is_root() {
        match fs::remove_file(&file) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CortexError::storage(file, e)),
        }
    }
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir).map_err(|e| CortexError::storage(dir.to_path_buf(), e))?;
    }
    let raw = serde_yaml::to_string(index)
        .map_err(|e| CortexError::index(format!("failed to render index for '{category}'"), e))?;
    write_atomic(&file, raw.as_bytes())
}

/// Refresh `parent`'s entry for `child`: upsert with the given count when
/// `child` has content, drop the entry otherwise. Descriptions on an
/// existing entry are preserved.
fn refresh_subcategory_entry(
    root: &Path,
    parent: &CategoryPath,
    child: &CategoryPath,
    child_has_content: bool,
    child_direct_count: u64,
) -> Result<()> {
    let mut index = read_index(root, parent)?;
    let existing = index.subcategories.iter().position(|s| &s.path == child);
    match (existing, child_has_content) {
        (Some(i), true) => index.subcategories[i].memory_count = child_direct_count,
        (Some(i), false) => {
            // A described child keeps its entry even when empty.
            if index.subcategories[i].description.is_some() {
                index.subcategories[i].memory_count = 0;
            } else {
                index.subcategories.remove(i);
            }
        }
        (None, true) => {
            index.subcategories.push(SubcategoryEntry {
                path: child.clone(),
                memory_count: child_direct_count,
                description: None,
            });
            index.subcategories.sort_by_key(|s| s.path.to_string());
        }
        (None, false) => return Ok(()),
    }
    write_index(root, parent, &index)
}

/// Walk upward from `category`, dropping entries for categories that became
/// empty and refreshing counts for the rest.
fn propagate_up(root: &Path, category: &CategoryPath) -> Result<()> {
    let mut current = category.clone();
    while let Some(parent) = current.parent() {
        let index = read_index(root, &current)?;
        refresh_subcategory_entry(
            root,
            &parent,
            &current,
            !index.is_empty(),
            index.memories.len() as u64,
        )?;
        current = parent;
    }
    Ok(())
}

/// Add `child` to `parent`'s subcategory list when absent. Existing entries
/// (and their descriptions) are untouched.
fn ensure_subcategory_entry(
    root: &Path,
    parent: &CategoryPath,
    child: &CategoryPath,
    child_direct_count: u64,
) -> Result<()> {
    let mut index = read_index(root, parent)?;
    if index.subcategories.iter().any(|s| &s.path == child) {
        return Ok(());
    }
    index.subcategories.push(SubcategoryEntry {
        path: child.clone(),
        memory_count: child_direct_count,
        description: None,
    });
    index.subcategories.sort_by_key(|s| s.path.to_string());
    write_index(root, parent, &index)
}

fn collect_entries(
    root: &Path,
    category: &CategoryPath,
    out: &mut Vec<CategoryIndexEntry>,
) -> Result<()> {
    let index = read_index(root, category)?;
    out.extend(index.memories);
    for sub in index.subcategories {
        collect_entries(root, &sub.path, out)?;
    }
    Ok(())
}

/// Legacy [`IndexStore`] over per-category `index.yaml` files.
pub struct YamlIndexStore {
    root: PathBuf,
}

impl YamlIndexStore {
    pub fn new(root: PathBuf) -> Self {
        YamlIndexStore { root }
    }
}

impl IndexStore for YamlIndexStore {
    fn load(&self, category: &CategoryPath) -> Result<CategoryIndex> {
        read_index(&self.root, category)
    }

    fn write(&self, category: &CategoryPath, index: &CategoryIndex) -> Result<()> {
        write_index(&self.root, category, index)
    }

    fn reindex(&self, scope: &CategoryPath) -> Result<ReindexReport> {
        let outcome = walk::scan(&self.root, scope)?;

        // Group direct memories per category.
        let mut direct: BTreeMap<String, Vec<CategoryIndexEntry>> = BTreeMap::new();
        for entry in outcome.entries.iter().cloned() {
            direct
                .entry(entry.path.parent().to_string())
                .or_default()
                .push(entry);
        }

        // Old descriptions, keyed by child path, harvested before any file
        // is rewritten. A described child that still has a directory
        // survives the rebuild even when it holds no memories.
        let mut descriptions: BTreeMap<String, String> = BTreeMap::new();
        let mut old_files = Vec::new();
        harvest(&self.root, scope, &mut descriptions, &mut old_files)?;

        // The categories that must exist in the rebuilt projection: every
        // ancestor chain of a memory-bearing category, plus described
        // categories whose directory survives.
        let mut live: BTreeSet<String> = BTreeSet::new();
        for category in direct.keys() {
            let path = CategoryPath::parse(category)?;
            for ancestor in path.ancestry() {
                live.insert(ancestor.to_string());
            }
        }
        for (path, _) in descriptions.iter() {
            let category = CategoryPath::parse(path)?;
            if !category.starts_with(scope) && !scope.is_root() {
                continue;
            }
            if self.root.join(category.to_fs_path()).is_dir() {
                for ancestor in category.ancestry() {
                    live.insert(ancestor.to_string());
                }
            }
        }

        // Rebuild and write each live category plus the scope itself.
        let mut written: BTreeSet<PathBuf> = BTreeSet::new();
        let mut targets: Vec<CategoryPath> = live
            .iter()
            .map(|s| CategoryPath::parse(s))
            .collect::<Result<_>>()?;
        if !live.contains(&scope.to_string()) {
            targets.push(scope.clone());
        }
        for category in &targets {
            if !category.starts_with(scope) {
                continue;
            }
            let memories = direct.remove(&category.to_string()).unwrap_or_default();
            let mut subcategories = Vec::new();
            for child in live.iter() {
                let child_path = CategoryPath::parse(child)?;
                if child_path.parent().as_ref() == Some(category) {
                    let count = outcome
                        .entries
                        .iter()
                        .filter(|e| e.path.parent() == &child_path)
                        .count() as u64;
                    subcategories.push(SubcategoryEntry {
                        path: child_path.clone(),
                        memory_count: count,
                        description: descriptions.get(child).cloned(),
                    });
                }
            }
            let index = CategoryIndex {
                memories,
                subcategories,
            };
            if !index.is_empty() || category.is_root() {
                write_index(&self.root, category, &index)?;
                written.insert(index_file(&self.root, category));
            }
        }

        // Stale index files under the scope are the reindex's to delete.
        for file in old_files {
            if !written.contains(&file) && file.exists() {
                fs::remove_file(&file).map_err(|e| CortexError::storage(file.clone(), e))?;
            }
        }

        // Reconnect the scope to its parent chain.
        if !scope.is_root() {
            propagate_up(&self.root, scope)?;
        }

        debug!(scope = %scope, indexed = outcome.entries.len(), "yaml reindex complete");
        Ok(ReindexReport {
            indexed: outcome.entries.len(),
            categories: live.len(),
            warnings: outcome.warnings,
        })
    }

    fn update_after_memory_write(
        &self,
        path: &MemoryPath,
        memory: &Memory,
        create_when_missing: bool,
    ) -> Result<()> {
        let category = path.parent();
        let mut index = read_index(&self.root, category)?;
        let entry = CategoryIndexEntry::from_memory(path, memory);
        match index.memories.iter().position(|m| m.path == *path) {
            Some(i) => index.memories[i] = entry,
            None => {
                index.memories.push(entry);
                index.memories.sort_by_key(|m| m.path.to_string());
            }
        }
        write_index(&self.root, category, &index)?;

        if create_when_missing {
            propagate_up(&self.root, category)?;
        }
        Ok(())
    }

    fn remove_entry(&self, path: &MemoryPath) -> Result<()> {
        let category = path.parent();
        let mut index = read_index(&self.root, category)?;
        index.memories.retain(|m| m.path != *path);
        write_index(&self.root, category, &index)?;
        propagate_up(&self.root, category)
    }

    fn remove_category(&self, category: &CategoryPath) -> Result<()> {
        if category.is_root() {
            return Err(CortexError::RootCategory { action: "deleted" });
        }
        // Index files inside the subtree vanish with the directory; what is
        // left to fix is the file itself (if the directory survives) and the
        // parent chain.
        let file = index_file(&self.root, category);
        if file.exists() {
            fs::remove_file(&file).map_err(|e| CortexError::storage(file, e))?;
        }
        if let Some(parent) = category.parent() {
            let mut index = read_index(&self.root, &parent)?;
            index.subcategories.retain(|s| s.path != *category);
            write_index(&self.root, &parent, &index)?;
            propagate_up(&self.root, &parent)?;
        }
        Ok(())
    }

    fn query(&self, filter: &QueryFilter) -> Result<Vec<CategoryIndexEntry>> {
        let start = filter.category.clone().unwrap_or_default();
        let mut entries = Vec::new();
        collect_entries(&self.root, &start, &mut entries)?;
        Ok(apply_filter(entries, filter))
    }
}

/// Collect descriptions and index-file paths from the existing projection.
fn harvest(
    root: &Path,
    scope: &CategoryPath,
    descriptions: &mut BTreeMap<String, String>,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let base = root.join(scope.to_fs_path());
    if !base.is_dir() {
        return Ok(());
    }
    let file = index_file(root, scope);
    if file.is_file() {
        files.push(file);
        let index = read_index(root, scope)?;
        for sub in &index.subcategories {
            if let Some(desc) = &sub.description {
                descriptions.insert(sub.path.to_string(), desc.clone());
            }
        }
    }
    let entries = fs::read_dir(&base).map_err(|e| CortexError::storage(base.clone(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CortexError::storage(base.clone(), e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let kind = entry
            .file_type()
            .map_err(|e| CortexError::storage(entry.path(), e))?;
        if kind.is_dir() {
            if let Ok(slug) = Slug::normalize(&name) {
                harvest(root, &scope.join(slug), descriptions, files)?;
            }
        }
    }
    Ok(())
}

/// [`CategoryStore`] paired with the YAML layout.
pub struct YamlCategoryStore {
    root: PathBuf,
    dirs: DirCategoryOps,
}

impl YamlCategoryStore {
    pub fn new(root: PathBuf) -> Self {
        let dirs = DirCategoryOps::new(root.clone());
        YamlCategoryStore { root, dirs }
    }
}

impl CategoryStore for YamlCategoryStore {
    fn exists(&self, path: &CategoryPath) -> Result<bool> {
        self.dirs.exists(path)
    }

    fn ensure(&self, path: &CategoryPath) -> Result<bool> {
        let created = self.dirs.ensure(path)?;
        for ancestor in path.ancestry() {
            if let Some(parent) = ancestor.parent() {
                let count = read_index(&self.root, &ancestor)?.memories.len() as u64;
                ensure_subcategory_entry(&self.root, &parent, &ancestor, count)?;
            }
        }
        Ok(created)
    }

    fn is_empty(&self, path: &CategoryPath) -> Result<bool> {
        self.dirs.is_empty(path)
    }

    fn delete(&self, path: &CategoryPath, recursive: bool) -> Result<()> {
        self.dirs.delete(path, recursive)
    }

    fn update_subcategory_description(
        &self,
        parent: &CategoryPath,
        child: &Slug,
        description: &str,
    ) -> Result<()> {
        let child_path = parent.join(child.clone());
        let child_index = read_index(&self.root, &child_path)?;
        let mut index = read_index(&self.root, parent)?;
        match index.subcategories.iter_mut().find(|s| s.path == child_path) {
            Some(entry) => entry.description = Some(description.to_string()),
            None => {
                index.subcategories.push(SubcategoryEntry {
                    path: child_path,
                    memory_count: child_index.memories.len() as u64,
                    description: Some(description.to_string()),
                });
                index.subcategories.sort_by_key(|s| s.path.to_string());
            }
        }
        write_index(&self.root, parent, &index)
    }

    fn remove_subcategory_entry(&self, parent: &CategoryPath, child: &Slug) -> Result<()> {
        let child_path = parent.join(child.clone());
        let mut index = read_index(&self.root, parent)?;
        index.subcategories.retain(|s| s.path != child_path);
        write_index(&self.root, parent, &index)
    }
}
