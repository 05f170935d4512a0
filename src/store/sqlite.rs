//! SQLite index layout: one `cortex.db` at the store root.
//!
//! The database is opened in WAL journal mode, so one writer and any number
//! of readers coexist without corrupting each other. Connections are opened
//! per operation and dropped immediately; the engine never holds a
//! long-running transaction.
//!
//! Two tables mirror the logical index schema:
//!
//! ```sql
//! memories(path PK, category, tags_json, token_estimate, source,
//!          created_at_ms, updated_at_ms, expires_at_ms, summary)
//! categories(path PK, parent_path, description)
//! ```

use crate::error::{CortexError, Result};
use crate::model::{CategoryIndex, CategoryIndexEntry, Memory, SubcategoryEntry};
use crate::path::{CategoryPath, MemoryPath, Slug};
use crate::store::fs::DirCategoryOps;
use crate::store::walk;
use crate::store::{apply_filter, CategoryStore, IndexStore, QueryFilter, ReindexReport};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DB_FILENAME: &str = "cortex.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    path            TEXT PRIMARY KEY,
    category        TEXT NOT NULL,
    tags_json       TEXT NOT NULL DEFAULT '[]',
    token_estimate  INTEGER NOT NULL DEFAULT 0,
    source          TEXT NOT NULL DEFAULT 'unknown',
    created_at_ms   INTEGER,
    updated_at_ms   INTEGER,
    expires_at_ms   INTEGER,
    summary         TEXT
);
CREATE INDEX IF NOT EXISTS memories_category ON memories(category);
CREATE INDEX IF NOT EXISTS memories_updated ON memories(updated_at_ms);
CREATE TABLE IF NOT EXISTS categories (
    path        TEXT PRIMARY KEY,
    parent_path TEXT NOT NULL,
    description TEXT
);
CREATE INDEX IF NOT EXISTS categories_parent ON categories(parent_path);
";

fn open_db(root: &Path) -> Result<Connection> {
    let conn = Connection::open(root.join(DB_FILENAME))?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn ms(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_ms(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<(String, String, CategoryIndexEntryRaw)> {
    Ok((
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        CategoryIndexEntryRaw {
            tags_json: row.get(2)?,
            token_estimate: row.get(3)?,
            source: row.get(4)?,
            created_at_ms: row.get(5)?,
            updated_at_ms: row.get(6)?,
            expires_at_ms: row.get(7)?,
            summary: row.get(8)?,
        },
    ))
}

struct CategoryIndexEntryRaw {
    tags_json: String,
    token_estimate: i64,
    source: String,
    created_at_ms: Option<i64>,
    updated_at_ms: Option<i64>,
    expires_at_ms: Option<i64>,
    summary: Option<String>,
}

impl CategoryIndexEntryRaw {
    fn into_entry(self, path: String) -> Result<CategoryIndexEntry> {
        let path = MemoryPath::parse(&path)?;
        let tags: Vec<String> = serde_json::from_str(&self.tags_json)
            .map_err(|e| CortexError::index(format!("bad tags_json for '{path}'"), e))?;
        Ok(CategoryIndexEntry {
            path,
            token_estimate: self.token_estimate.max(0) as u64,
            tags,
            source: self.source,
            created_at: from_ms(self.created_at_ms),
            updated_at: from_ms(self.updated_at_ms),
            expires_at: from_ms(self.expires_at_ms),
            summary: self.summary,
        })
    }
}

fn upsert_entry(conn: &Connection, entry: &CategoryIndexEntry) -> Result<()> {
    let tags_json = serde_json::to_string(&entry.tags)
        .map_err(|e| CortexError::index("failed to encode tags", e))?;
    conn.execute(
        "INSERT INTO memories
             (path, category, tags_json, token_estimate, source,
              created_at_ms, updated_at_ms, expires_at_ms, summary)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(path) DO UPDATE SET
             category = excluded.category,
             tags_json = excluded.tags_json,
             token_estimate = excluded.token_estimate,
             source = excluded.source,
             created_at_ms = excluded.created_at_ms,
             updated_at_ms = excluded.updated_at_ms,
             expires_at_ms = excluded.expires_at_ms,
             summary = excluded.summary",
        params![
            entry.path.to_string(),
            entry.path.parent().to_string(),
            tags_json,
            entry.token_estimate as i64,
            entry.source,
            entry.created_at.map(ms),
            entry.updated_at.map(ms),
            entry.expires_at.map(ms),
            entry.summary,
        ],
    )?;
    Ok(())
}

/// Insert missing `categories` rows for every ancestor of `category`.
/// Existing rows (and their descriptions) are left untouched.
fn ensure_category_rows(conn: &Connection, category: &CategoryPath) -> Result<()> {
    for ancestor in category.ancestry() {
        let parent = ancestor.parent().unwrap_or_default();
        conn.execute(
            "INSERT OR IGNORE INTO categories (path, parent_path, description)
             VALUES (?1, ?2, NULL)",
            params![ancestor.to_string(), parent.to_string()],
        )?;
    }
    Ok(())
}

fn has_children(conn: &Connection, category: &CategoryPath) -> Result<bool> {
    let key = category.to_string();
    let memories: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE category = ?1",
        params![key],
        |row| row.get(0),
    )?;
    if memories > 0 {
        return Ok(true);
    }
    let subcats: i64 = conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE parent_path = ?1",
        params![key],
        |row| row.get(0),
    )?;
    Ok(subcats > 0)
}

/// Remove `categories` rows that no longer anchor anything, walking from
/// `category` toward the root.
fn prune_orphan_categories(conn: &Connection, category: &CategoryPath) -> Result<()> {
    let mut current = category.clone();
    while !current.is_root() {
        if has_children(conn, &current)? {
            break;
        }
        conn.execute(
            "DELETE FROM categories WHERE path = ?1",
            params![current.to_string()],
        )?;
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Ok(())
}

fn select_entries(conn: &Connection, scope: Option<&CategoryPath>) -> Result<Vec<CategoryIndexEntry>> {
    let sql = "SELECT path, category, tags_json, token_estimate, source,
                      created_at_ms, updated_at_ms, expires_at_ms, summary
               FROM memories";
    let mut out = Vec::new();
    let mut push = |raw: (String, String, CategoryIndexEntryRaw)| -> Result<()> {
        out.push(raw.2.into_entry(raw.0)?);
        Ok(())
    };
    match scope {
        Some(scope) if !scope.is_root() => {
            let mut stmt = conn.prepare(&format!(
                "{sql} WHERE category = ?1 OR category LIKE ?2"
            ))?;
            let rows = stmt.query_map(
                params![scope.to_string(), format!("{scope}/%")],
                row_to_entry,
            )?;
            for row in rows {
                push(row?)?;
            }
        }
        _ => {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map([], row_to_entry)?;
            for row in rows {
                push(row?)?;
            }
        }
    }
    Ok(out)
}

/// Preferred [`IndexStore`]: surgical updates and queries over `cortex.db`.
pub struct SqliteIndexStore {
    root: PathBuf,
}

impl SqliteIndexStore {
    pub fn new(root: PathBuf) -> Self {
        SqliteIndexStore { root }
    }
}

impl IndexStore for SqliteIndexStore {
    fn load(&self, category: &CategoryPath) -> Result<CategoryIndex> {
        let conn = open_db(&self.root)?;
        let key = category.to_string();

        let mut stmt = conn.prepare(
            "SELECT path, category, tags_json, token_estimate, source,
                    created_at_ms, updated_at_ms, expires_at_ms, summary
             FROM memories WHERE category = ?1 ORDER BY path",
        )?;
        let mut memories = Vec::new();
        for row in stmt.query_map(params![key], row_to_entry)? {
            let raw = row?;
            memories.push(raw.2.into_entry(raw.0)?);
        }

        let mut stmt = conn.prepare(
            "SELECT path, description FROM categories WHERE parent_path = ?1 ORDER BY path",
        )?;
        let children: Vec<(String, Option<String>)> = stmt
            .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut subcategories = Vec::new();
        for (child, description) in children {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE category = ?1",
                params![child],
                |row| row.get(0),
            )?;
            subcategories.push(SubcategoryEntry {
                path: CategoryPath::parse(&child)?,
                memory_count: count.max(0) as u64,
                description,
            });
        }

        Ok(CategoryIndex {
            memories,
            subcategories,
        })
    }

    fn write(&self, category: &CategoryPath, index: &CategoryIndex) -> Result<()> {
        let mut conn = open_db(&self.root)?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM memories WHERE category = ?1",
            params![category.to_string()],
        )?;
        for entry in &index.memories {
            upsert_entry(&tx, entry)?;
        }
        for sub in &index.subcategories {
            tx.execute(
                "INSERT INTO categories (path, parent_path, description)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(path) DO UPDATE SET description = excluded.description",
                params![
                    sub.path.to_string(),
                    category.to_string(),
                    sub.description
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn reindex(&self, scope: &CategoryPath) -> Result<ReindexReport> {
        let outcome = walk::scan(&self.root, scope)?;
        let mut conn = open_db(&self.root)?;
        let tx = conn.transaction()?;

        // Descriptions are derived state we must not lose for categories
        // that still exist after the rebuild.
        let mut stmt = tx.prepare(
            "SELECT path, description FROM categories WHERE description IS NOT NULL",
        )?;
        let descriptions: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        drop(stmt);

        if scope.is_root() {
            tx.execute("DELETE FROM memories", [])?;
            tx.execute("DELETE FROM categories", [])?;
        } else {
            let key = scope.to_string();
            let like = format!("{key}/%");
            tx.execute(
                "DELETE FROM memories WHERE category = ?1 OR category LIKE ?2",
                params![key, like],
            )?;
            tx.execute(
                "DELETE FROM categories WHERE path = ?1 OR path LIKE ?2",
                params![key, like],
            )?;
        }

        for entry in &outcome.entries {
            upsert_entry(&tx, entry)?;
            ensure_category_rows(&tx, entry.path.parent())?;
        }

        // Re-seed descriptions: categories that kept memories get theirs
        // back in place; described-but-empty categories survive as long as
        // their directory still exists.
        for (path, description) in descriptions {
            let category = CategoryPath::parse(&path)?;
            if !category.starts_with(scope) && !scope.is_root() {
                continue;
            }
            let present: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM categories WHERE path = ?1",
                    params![path],
                    |row| row.get(0),
                )
                .optional()?;
            if present.is_none() {
                if !self.root.join(category.to_fs_path()).is_dir() {
                    continue;
                }
                ensure_category_rows(&tx, &category)?;
            }
            tx.execute(
                "UPDATE categories SET description = ?2 WHERE path = ?1",
                params![path, description],
            )?;
        }

        let categories: i64 =
            tx.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        tx.commit()?;

        debug!(scope = %scope, indexed = outcome.entries.len(), "sqlite reindex complete");
        Ok(ReindexReport {
            indexed: outcome.entries.len(),
            categories: categories.max(0) as usize,
            warnings: outcome.warnings,
        })
    }

    fn update_after_memory_write(
        &self,
        path: &MemoryPath,
        memory: &Memory,
        create_when_missing: bool,
    ) -> Result<()> {
        let conn = open_db(&self.root)?;
        upsert_entry(&conn, &CategoryIndexEntry::from_memory(path, memory))?;
        if create_when_missing {
            ensure_category_rows(&conn, path.parent())?;
        }
        Ok(())
    }

    fn remove_entry(&self, path: &MemoryPath) -> Result<()> {
        let conn = open_db(&self.root)?;
        conn.execute(
            "DELETE FROM memories WHERE path = ?1",
            params![path.to_string()],
        )?;
        prune_orphan_categories(&conn, path.parent())?;
        Ok(())
    }

    fn remove_category(&self, category: &CategoryPath) -> Result<()> {
        if category.is_root() {
            return Err(CortexError::RootCategory { action: "deleted" });
        }
        let conn = open_db(&self.root)?;
        let key = category.to_string();
        let like = format!("{key}/%");
        conn.execute(
            "DELETE FROM memories WHERE category = ?1 OR category LIKE ?2",
            params![key, like],
        )?;
        conn.execute(
            "DELETE FROM categories WHERE path = ?1 OR path LIKE ?2",
            params![key, like],
        )?;
        if let Some(parent) = category.parent() {
            prune_orphan_categories(&conn, &parent)?;
        }
        Ok(())
    }

    fn query(&self, filter: &QueryFilter) -> Result<Vec<CategoryIndexEntry>> {
        let conn = open_db(&self.root)?;
        let entries = select_entries(&conn, filter.category.as_ref())?;
        Ok(apply_filter(entries, filter))
    }
}

/// [`CategoryStore`] paired with the SQLite layout: directories on disk,
/// descriptions and subcategory entries in `cortex.db`.
pub struct SqliteCategoryStore {
    root: PathBuf,
    dirs: DirCategoryOps,
}

impl SqliteCategoryStore {
    pub fn new(root: PathBuf) -> Self {
        let dirs = DirCategoryOps::new(root.clone());
        SqliteCategoryStore { root, dirs }
    }
}

impl CategoryStore for SqliteCategoryStore {
    fn exists(&self, path: &CategoryPath) -> Result<bool> {
        self.dirs.exists(path)
    }

    fn ensure(&self, path: &CategoryPath) -> Result<bool> {
        let created = self.dirs.ensure(path)?;
        let conn = open_db(&self.root)?;
        ensure_category_rows(&conn, path)?;
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
        let conn = open_db(&self.root)?;
        ensure_category_rows(&conn, &child_path)?;
        conn.execute(
            "UPDATE categories SET description = ?2 WHERE path = ?1",
            params![child_path.to_string(), description],
        )?;
        Ok(())
    }

    fn remove_subcategory_entry(&self, parent: &CategoryPath, child: &Slug) -> Result<()> {
        let child_path = parent.join(child.clone());
        let conn = open_db(&self.root)?;
        conn.execute(
            "DELETE FROM categories WHERE path = ?1",
            params![child_path.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Memory, MemoryDraft};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn memory(content: &str, tags: &[&str], at: i64) -> Memory {
        Memory::new(
            MemoryDraft {
                content: content.into(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                source: "user".into(),
                ..Default::default()
            },
            Utc.timestamp_opt(at, 0).unwrap(),
        )
        .unwrap()
    }

    fn setup() -> (TempDir, SqliteIndexStore, SqliteCategoryStore) {
        let dir = TempDir::new().unwrap();
        let index = SqliteIndexStore::new(dir.path().to_path_buf());
        let categories = SqliteCategoryStore::new(dir.path().to_path_buf());
        (dir, index, categories)
    }

    fn mp(s: &str) -> MemoryPath {
        MemoryPath::parse(s).unwrap()
    }

    fn cp(s: &str) -> CategoryPath {
        CategoryPath::parse(s).unwrap()
    }

    #[test]
    fn upsert_then_load_lists_the_row() {
        let (_dir, index, _) = setup();
        let m = memory("hello world", &["x"], 100);
        index
            .update_after_memory_write(&mp("a/b/note"), &m, true)
            .unwrap();

        let loaded = index.load(&cp("a/b")).unwrap();
        assert_eq!(loaded.memories.len(), 1);
        assert_eq!(loaded.memories[0].path, mp("a/b/note"));
        assert_eq!(loaded.memories[0].tags, vec!["x"]);

        // Ancestors gained subcategory entries.
        let root = index.load(&CategoryPath::root()).unwrap();
        assert_eq!(root.subcategories.len(), 1);
        assert_eq!(root.subcategories[0].path, cp("a"));
        let a = index.load(&cp("a")).unwrap();
        assert_eq!(a.subcategories[0].path, cp("a/b"));
        assert_eq!(a.subcategories[0].memory_count, 1);
    }

    #[test]
    fn memory_count_is_direct() {
        let (_dir, index, _) = setup();
        index
            .update_after_memory_write(&mp("a/one"), &memory("1", &[], 1), true)
            .unwrap();
        index
            .update_after_memory_write(&mp("a/two"), &memory("2", &[], 2), true)
            .unwrap();
        let root = index.load(&CategoryPath::root()).unwrap();
        assert_eq!(root.subcategories[0].memory_count, 2);
    }

    #[test]
    fn remove_entry_prunes_orphan_chain() {
        let (_dir, index, _) = setup();
        index
            .update_after_memory_write(&mp("a/b/c/note"), &memory("x", &[], 1), true)
            .unwrap();
        index.remove_entry(&mp("a/b/c/note")).unwrap();

        let root = index.load(&CategoryPath::root()).unwrap();
        assert!(root.subcategories.is_empty());
        assert!(index.load(&cp("a")).unwrap().is_empty());
    }

    #[test]
    fn remove_entry_keeps_populated_ancestors() {
        let (_dir, index, _) = setup();
        index
            .update_after_memory_write(&mp("a/keep"), &memory("x", &[], 1), true)
            .unwrap();
        index
            .update_after_memory_write(&mp("a/b/gone"), &memory("y", &[], 2), true)
            .unwrap();
        index.remove_entry(&mp("a/b/gone")).unwrap();

        let a = index.load(&cp("a")).unwrap();
        assert_eq!(a.memories.len(), 1);
        assert!(a.subcategories.is_empty());
        let root = index.load(&CategoryPath::root()).unwrap();
        assert_eq!(root.subcategories.len(), 1);
    }

    #[test]
    fn descriptions_survive_memory_updates() {
        let (_dir, index, categories) = setup();
        categories.ensure(&cp("a")).unwrap();
        categories
            .update_subcategory_description(&CategoryPath::root(), &Slug::parse("a").unwrap(), "docs")
            .unwrap();
        index
            .update_after_memory_write(&mp("a/note"), &memory("x", &[], 1), true)
            .unwrap();

        let root = index.load(&CategoryPath::root()).unwrap();
        assert_eq!(root.subcategories[0].description.as_deref(), Some("docs"));
    }

    #[test]
    fn reindex_rebuilds_from_disk_and_drops_stale_rows() {
        let (dir, index, _) = setup();
        // Real file on disk.
        let m = memory("kept", &["t"], 50);
        std::fs::create_dir_all(dir.path().join("alpha")).unwrap();
        std::fs::write(
            dir.path().join("alpha/a.md"),
            crate::frontmatter::serialize(&m).unwrap(),
        )
        .unwrap();
        // Stale row with no file behind it.
        index
            .update_after_memory_write(&mp("beta/b"), &memory("stale", &[], 60), true)
            .unwrap();

        let report = index.reindex(&CategoryPath::root()).unwrap();
        assert_eq!(report.indexed, 1);

        let root = index.load(&CategoryPath::root()).unwrap();
        let names: Vec<String> = root.subcategories.iter().map(|s| s.path.to_string()).collect();
        assert_eq!(names, vec!["alpha"]);
        assert_eq!(index.load(&cp("alpha")).unwrap().memories.len(), 1);
    }

    #[test]
    fn reindex_is_idempotent() {
        let (dir, index, _) = setup();
        let m = memory("body", &[], 10);
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(
            dir.path().join("a/b/n.md"),
            crate::frontmatter::serialize(&m).unwrap(),
        )
        .unwrap();

        index.reindex(&CategoryPath::root()).unwrap();
        let first = index.load(&cp("a/b")).unwrap();
        index.reindex(&CategoryPath::root()).unwrap();
        let second = index.load(&cp("a/b")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reindex_preserves_descriptions_of_surviving_categories() {
        let (dir, index, categories) = setup();
        let m = memory("body", &[], 10);
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::write(
            dir.path().join("a/n.md"),
            crate::frontmatter::serialize(&m).unwrap(),
        )
        .unwrap();
        categories
            .update_subcategory_description(&CategoryPath::root(), &Slug::parse("a").unwrap(), "kept")
            .unwrap();

        index.reindex(&CategoryPath::root()).unwrap();
        let root = index.load(&CategoryPath::root()).unwrap();
        assert_eq!(root.subcategories[0].description.as_deref(), Some("kept"));
    }

    #[test]
    fn scoped_reindex_leaves_other_categories_alone() {
        let (dir, index, _) = setup();
        index
            .update_after_memory_write(&mp("other/keep"), &memory("x", &[], 1), true)
            .unwrap();
        std::fs::create_dir_all(dir.path().join("scope")).unwrap();
        std::fs::write(
            dir.path().join("scope/n.md"),
            crate::frontmatter::serialize(&memory("y", &[], 2)).unwrap(),
        )
        .unwrap();

        index.reindex(&cp("scope")).unwrap();
        assert_eq!(index.load(&cp("other")).unwrap().memories.len(), 1);
        assert_eq!(index.load(&cp("scope")).unwrap().memories.len(), 1);
    }

    #[test]
    fn query_filters_and_orders() {
        let (_dir, index, _) = setup();
        index
            .update_after_memory_write(&mp("a/p"), &memory("1", &["a"], 10), true)
            .unwrap();
        index
            .update_after_memory_write(&mp("a/q"), &memory("2", &["a", "b"], 20), true)
            .unwrap();
        index
            .update_after_memory_write(&mp("a/r"), &memory("3", &["c"], 30), true)
            .unwrap();

        let mut filter = QueryFilter::at(Utc.timestamp_opt(100, 0).unwrap());
        filter.tags = vec!["a".into()];
        let hits = index.query(&filter).unwrap();
        let paths: Vec<String> = hits.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["a/q", "a/p"]);
    }

    #[test]
    fn remove_category_drops_subtree_projection() {
        let (_dir, index, _) = setup();
        index
            .update_after_memory_write(&mp("a/b/one"), &memory("1", &[], 1), true)
            .unwrap();
        index
            .update_after_memory_write(&mp("a/b/c/two"), &memory("2", &[], 2), true)
            .unwrap();
        index
            .update_after_memory_write(&mp("z/keep"), &memory("3", &[], 3), true)
            .unwrap();

        index.remove_category(&cp("a/b")).unwrap();
        let filter = QueryFilter::at(Utc.timestamp_opt(100, 0).unwrap());
        let paths: Vec<String> = index
            .query(&filter)
            .unwrap()
            .iter()
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(paths, vec!["z/keep"]);
        // The emptied parent chain is pruned too.
        assert!(index.load(&CategoryPath::root()).unwrap().subcategories.iter().all(|s| s.path == cp("z")));
    }
}
