//! In-memory implementations of the scoped ports, for testing command logic
//! without filesystem I/O.
//!
//! All three stores share one [`MemState`] behind a mutex, mirroring how the
//! filesystem implementations share a store root. The `memories` map plays
//! the role of the files on disk (ground truth); `rows` and `cats` play the
//! derived index, maintained with the same semantics as the SQLite layout so
//! command tests exercise real index behavior.

use crate::error::{CortexError, Result};
use crate::model::{CategoryIndex, CategoryIndexEntry, Memory, SubcategoryEntry};
use crate::path::{CategoryPath, MemoryPath, Slug};
use crate::store::{
    apply_filter, CategoryStore, IndexStore, MemoryStore, QueryFilter, ReindexReport,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MemState {
    /// Ground truth, keyed by canonical memory path.
    memories: BTreeMap<String, Memory>,
    /// Category "directories".
    dirs: BTreeSet<String>,
    /// Derived index rows.
    rows: BTreeMap<String, CategoryIndexEntry>,
    /// Derived category entries with optional description.
    cats: BTreeMap<String, Option<String>>,
}

pub type SharedState = Arc<Mutex<MemState>>;

impl MemState {
    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(MemState::default()))
    }
}

fn parent_key(key: &str) -> String {
    key.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_default()
}

fn ensure_cat_rows(state: &mut MemState, category: &CategoryPath) {
    for ancestor in category.ancestry() {
        state.cats.entry(ancestor.to_string()).or_insert(None);
    }
}

fn has_index_children(state: &MemState, key: &str) -> bool {
    let prefix = if key.is_empty() {
        String::new()
    } else {
        format!("{key}/")
    };
    state.rows.keys().any(|k| parent_key(k) == key)
        || state
            .cats
            .keys()
            .any(|k| k.starts_with(&prefix) && !k.is_empty() && parent_key(k) == key)
}

fn prune_orphans(state: &mut MemState, category: &CategoryPath) {
    let mut current = category.clone();
    while !current.is_root() {
        let key = current.to_string();
        if has_index_children(state, &key) {
            break;
        }
        state.cats.remove(&key);
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
}

pub struct MemMemoryStore {
    state: SharedState,
}

impl MemMemoryStore {
    pub fn new(state: SharedState) -> Self {
        MemMemoryStore { state }
    }
}

impl MemoryStore for MemMemoryStore {
    fn load(&self, path: &MemoryPath) -> Result<Memory> {
        self.state
            .lock()
            .unwrap()
            .memories
            .get(&path.to_string())
            .cloned()
            .ok_or_else(|| CortexError::MemoryNotFound {
                path: path.to_string(),
            })
    }

    fn exists(&self, path: &MemoryPath) -> Result<bool> {
        Ok(self.state.lock().unwrap().memories.contains_key(&path.to_string()))
    }

    fn add(&self, path: &MemoryPath, memory: &Memory) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = path.to_string();
        if state.memories.contains_key(&key) {
            return Err(CortexError::MemoryAlreadyExists { path: key });
        }
        state.memories.insert(key, memory.clone());
        Ok(())
    }

    fn save(&self, path: &MemoryPath, memory: &Memory) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .memories
            .insert(path.to_string(), memory.clone());
        Ok(())
    }

    fn remove(&self, path: &MemoryPath) -> Result<()> {
        self.state.lock().unwrap().memories.remove(&path.to_string());
        Ok(())
    }

    fn rename(&self, src: &MemoryPath, dst: &MemoryPath) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let dst_key = dst.to_string();
        if state.memories.contains_key(&dst_key) {
            return Err(CortexError::MemoryAlreadyExists { path: dst_key });
        }
        match state.memories.remove(&src.to_string()) {
            Some(memory) => {
                state.memories.insert(dst_key, memory);
                Ok(())
            }
            None => Err(CortexError::MemoryNotFound {
                path: src.to_string(),
            }),
        }
    }
}

pub struct MemCategoryStore {
    state: SharedState,
}

impl MemCategoryStore {
    pub fn new(state: SharedState) -> Self {
        MemCategoryStore { state }
    }
}

impl CategoryStore for MemCategoryStore {
    fn exists(&self, path: &CategoryPath) -> Result<bool> {
        if path.is_root() {
            return Ok(true);
        }
        Ok(self.state.lock().unwrap().dirs.contains(&path.to_string()))
    }

    fn ensure(&self, path: &CategoryPath) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let mut created = false;
        for ancestor in path.ancestry() {
            created = state.dirs.insert(ancestor.to_string());
        }
        ensure_cat_rows(&mut state, path);
        Ok(created)
    }

    fn is_empty(&self, path: &CategoryPath) -> Result<bool> {
        let state = self.state.lock().unwrap();
        let prefix = format!("{path}/");
        let has_memories = state
            .memories
            .keys()
            .any(|k| k.starts_with(&prefix) && parent_key(k) == path.to_string());
        let has_subdirs = state.dirs.iter().any(|d| d.starts_with(&prefix));
        Ok(!has_memories && !has_subdirs)
    }

    fn delete(&self, path: &CategoryPath, recursive: bool) -> Result<()> {
        if path.is_root() {
            return Err(CortexError::RootCategory { action: "deleted" });
        }
        let key = path.to_string();
        {
            let state = self.state.lock().unwrap();
            if !state.dirs.contains(&key) {
                return Err(CortexError::CategoryNotFound { path: key });
            }
        }
        if !recursive && !self.is_empty(path)? {
            return Err(CortexError::CategoryNotEmpty {
                path: path.to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        let prefix = format!("{key}/");
        state.dirs.retain(|d| d != &key && !d.starts_with(&prefix));
        state.memories.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    fn update_subcategory_description(
        &self,
        parent: &CategoryPath,
        child: &Slug,
        description: &str,
    ) -> Result<()> {
        let child_path = parent.join(child.clone());
        let mut state = self.state.lock().unwrap();
        ensure_cat_rows(&mut state, &child_path);
        state
            .cats
            .insert(child_path.to_string(), Some(description.to_string()));
        Ok(())
    }

    fn remove_subcategory_entry(&self, parent: &CategoryPath, child: &Slug) -> Result<()> {
        let child_path = parent.join(child.clone());
        self.state.lock().unwrap().cats.remove(&child_path.to_string());
        Ok(())
    }
}

pub struct MemIndexStore {
    state: SharedState,
}

impl MemIndexStore {
    pub fn new(state: SharedState) -> Self {
        MemIndexStore { state }
    }
}

impl IndexStore for MemIndexStore {
    fn load(&self, category: &CategoryPath) -> Result<CategoryIndex> {
        let state = self.state.lock().unwrap();
        let key = category.to_string();
        let memories: Vec<CategoryIndexEntry> = state
            .rows
            .values()
            .filter(|e| e.path.parent().to_string() == key)
            .cloned()
            .collect();
        let mut subcategories = Vec::new();
        for (cat, description) in &state.cats {
            if parent_key(cat) == key && !cat.is_empty() {
                let count = state
                    .rows
                    .values()
                    .filter(|e| &e.path.parent().to_string() == cat)
                    .count() as u64;
                subcategories.push(SubcategoryEntry {
                    path: CategoryPath::parse(cat)?,
                    memory_count: count,
                    description: description.clone(),
                });
            }
        }
        Ok(CategoryIndex {
            memories,
            subcategories,
        })
    }

    fn write(&self, category: &CategoryPath, index: &CategoryIndex) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = category.to_string();
        state.rows.retain(|k, _| parent_key(k) != key);
        for entry in &index.memories {
            state.rows.insert(entry.path.to_string(), entry.clone());
        }
        for sub in &index.subcategories {
            state
                .cats
                .insert(sub.path.to_string(), sub.description.clone());
        }
        Ok(())
    }

    fn reindex(&self, scope: &CategoryPath) -> Result<ReindexReport> {
        let mut state = self.state.lock().unwrap();
        let in_scope = |key: &str| -> bool {
            scope.is_root()
                || key == scope.to_string()
                || key.starts_with(&format!("{scope}/"))
        };

        let described: Vec<(String, String)> = state
            .cats
            .iter()
            .filter_map(|(k, d)| d.clone().map(|d| (k.clone(), d)))
            .collect();

        state.rows.retain(|k, _| !in_scope(&parent_key(k)));
        state.cats.retain(|k, _| !in_scope(k));

        let ground_truth: Vec<(String, Memory)> = state
            .memories
            .iter()
            .filter(|(k, _)| in_scope(&parent_key(k)))
            .map(|(k, m)| (k.clone(), m.clone()))
            .collect();
        let indexed = ground_truth.len();
        for (key, memory) in ground_truth {
            let path = MemoryPath::parse(&key)?;
            let entry = CategoryIndexEntry::from_memory(&path, &memory);
            ensure_cat_rows(&mut state, path.parent());
            state.rows.insert(key, entry);
        }

        for (key, description) in described {
            if !in_scope(&key) {
                continue;
            }
            if state.cats.contains_key(&key) {
                state.cats.insert(key, Some(description));
            } else if state.dirs.contains(&key) {
                ensure_cat_rows(&mut state, &CategoryPath::parse(&key)?);
                state.cats.insert(key, Some(description));
            }
        }

        let categories = state.cats.len();
        Ok(ReindexReport {
            indexed,
            categories,
            warnings: Vec::new(),
        })
    }

    fn update_after_memory_write(
        &self,
        path: &MemoryPath,
        memory: &Memory,
        create_when_missing: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .rows
            .insert(path.to_string(), CategoryIndexEntry::from_memory(path, memory));
        if create_when_missing {
            ensure_cat_rows(&mut state, path.parent());
        }
        Ok(())
    }

    fn remove_entry(&self, path: &MemoryPath) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.rows.remove(&path.to_string());
        prune_orphans(&mut state, path.parent());
        Ok(())
    }

    fn remove_category(&self, category: &CategoryPath) -> Result<()> {
        if category.is_root() {
            return Err(CortexError::RootCategory { action: "deleted" });
        }
        let mut state = self.state.lock().unwrap();
        let key = category.to_string();
        let prefix = format!("{key}/");
        state
            .rows
            .retain(|k, _| parent_key(k) != key && !parent_key(k).starts_with(&prefix));
        state.cats.retain(|k, _| k != &key && !k.starts_with(&prefix));
        if let Some(parent) = category.parent() {
            prune_orphans(&mut state, &parent);
        }
        Ok(())
    }

    fn query(&self, filter: &QueryFilter) -> Result<Vec<CategoryIndexEntry>> {
        let entries: Vec<CategoryIndexEntry> =
            self.state.lock().unwrap().rows.values().cloned().collect();
        Ok(apply_filter(entries, filter))
    }
}
