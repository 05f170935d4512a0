//! Ground-truth filesystem walk behind [`IndexStore::reindex`].
//!
//! The walk enumerates every `*.md` file under a scope, derives each file's
//! canonical slug path, and extracts the metadata the index needs. It never
//! fails a whole rebuild over one bad file: unreadable or malformed entries
//! degrade to warnings, and files whose names normalize to nothing are
//! skipped with a warning.
//!
//! [`IndexStore::reindex`]: crate::store::IndexStore::reindex

use crate::error::{CortexError, Result};
use crate::frontmatter;
use crate::model::{summarize, token_estimate, CategoryIndexEntry};
use crate::path::{CategoryPath, MemoryPath, Slug};
use crate::store::fs::is_index_artifact;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of scanning a scope: one index row per kept file, plus warnings.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub entries: Vec<CategoryIndexEntry>,
    pub warnings: Vec<String>,
}

/// Scan all memory files under `scope` (relative to `root`).
///
/// Entries come back keyed by canonical slug path: file path segments are
/// run through [`Slug::normalize`], and two files that normalize to the same
/// path are disambiguated deterministically by suffixing the leaf with `-2`,
/// `-3`, … in filename order.
pub fn scan(root: &Path, scope: &CategoryPath) -> Result<ScanOutcome> {
    let base = root.join(scope.to_fs_path());
    let mut outcome = ScanOutcome::default();
    if !base.is_dir() {
        return Ok(outcome);
    }

    let mut files = Vec::new();
    collect_md_files(&base, &mut files)?;
    // Filename order keeps collision suffixes stable across runs.
    files.sort();

    let mut by_path: BTreeMap<String, CategoryIndexEntry> = BTreeMap::new();
    for file in files {
        let rel = file.strip_prefix(root).unwrap_or(&file);
        let slug_path = match normalize_rel_path(rel) {
            Ok(path) => path,
            Err(reason) => {
                warn!(file = %rel.display(), %reason, "skipping file during reindex");
                outcome.warnings.push(format!("{}: {reason}", rel.display()));
                continue;
            }
        };
        let raw_path = rel_as_slash_string(rel);
        if raw_path != format!("{slug_path}.md") {
            let msg = format!(
                "{}: non-canonical name, indexed as '{slug_path}'",
                rel.display()
            );
            warn!("{msg}");
            outcome.warnings.push(msg);
        }

        let slug_path = match disambiguate(slug_path, &by_path) {
            (path, false) => path,
            (path, true) => {
                let msg = format!(
                    "{}: slug path collision, renamed to '{path}' in the index",
                    rel.display()
                );
                warn!("{msg}");
                outcome.warnings.push(msg);
                path
            }
        };

        let entry = match read_entry(&file, &slug_path) {
            Ok(entry) => entry,
            Err(reason) => {
                outcome
                    .warnings
                    .push(format!("{}: {reason}; indexed with file metadata only", rel.display()));
                fallback_entry(&file, &slug_path)?
            }
        };
        by_path.insert(slug_path.to_string(), entry);
    }

    outcome.entries = by_path.into_values().collect();
    debug!(
        scope = %scope,
        entries = outcome.entries.len(),
        warnings = outcome.warnings.len(),
        "scan complete"
    );
    Ok(outcome)
}

fn collect_md_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| CortexError::storage(dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CortexError::storage(dir.to_path_buf(), e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || is_index_artifact(&name) {
            continue;
        }
        let path = entry.path();
        let kind = entry
            .file_type()
            .map_err(|e| CortexError::storage(path.clone(), e))?;
        if kind.is_dir() {
            collect_md_files(&path, out)?;
        } else if name.ends_with(".md") {
            out.push(path);
        }
    }
    Ok(())
}

/// Derive the canonical slug path for a file relative to the store root.
fn normalize_rel_path(rel: &Path) -> std::result::Result<MemoryPath, String> {
    let mut segments = Vec::new();
    let components: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let (leaf_raw, dirs) = components
        .split_last()
        .ok_or_else(|| "empty path".to_string())?;
    for dir in dirs {
        segments.push(normalize_segment(dir)?);
    }
    let stem = leaf_raw.strip_suffix(".md").unwrap_or(leaf_raw);
    let leaf = normalize_segment(stem)?;
    Ok(MemoryPath::new(CategoryPath::from_segments(segments), leaf))
}

fn normalize_segment(raw: &str) -> std::result::Result<Slug, String> {
    Slug::normalize(raw).map_err(|_| format!("segment '{raw}' normalizes to nothing"))
}

fn rel_as_slash_string(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Suffix the leaf with `-2`, `-3`, … until the path is unused. Returns the
/// chosen path and whether a rename was needed.
fn disambiguate(
    path: MemoryPath,
    taken: &BTreeMap<String, CategoryIndexEntry>,
) -> (MemoryPath, bool) {
    if !taken.contains_key(&path.to_string()) {
        return (path, false);
    }
    let (category, leaf) = path.split();
    let mut n = 2u32;
    loop {
        // The base leaf is already canonical, so the suffixed form is too.
        let candidate = Slug::parse(&format!("{leaf}-{n}")).expect("suffixed slug is canonical");
        let candidate = MemoryPath::new(category.clone(), candidate);
        if !taken.contains_key(&candidate.to_string()) {
            return (candidate, true);
        }
        n += 1;
    }
}

fn read_entry(
    file: &Path,
    slug_path: &MemoryPath,
) -> std::result::Result<CategoryIndexEntry, String> {
    let raw = fs::read_to_string(file).map_err(|e| e.to_string())?;
    let memory = frontmatter::parse(&raw, &slug_path.to_string()).map_err(|e| e.to_string())?;
    Ok(CategoryIndexEntry::from_memory(slug_path, &memory))
}

/// Entry for a file whose frontmatter could not be parsed: token estimate
/// over the raw bytes, timestamps from the file mtime, no tags.
fn fallback_entry(file: &Path, slug_path: &MemoryPath) -> Result<CategoryIndexEntry> {
    let raw = fs::read_to_string(file).unwrap_or_default();
    let mtime: Option<DateTime<Utc>> = fs::metadata(file)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);
    Ok(CategoryIndexEntry {
        path: slug_path.clone(),
        token_estimate: token_estimate(&raw),
        tags: Vec::new(),
        source: "unknown".to_string(),
        created_at: None,
        updated_at: mtime,
        expires_at: None,
        summary: summarize(&raw),
    })
}
