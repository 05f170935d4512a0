//! # Command Layer
//!
//! The business logic of the engine. Each operation lives in its own
//! submodule as a `run` function (or a small family of them) that takes a
//! [`ScopedAdapter`] by reference, validates its input, calls the storage
//! ports in a disciplined order, and returns a typed result.
//!
//! Commands are where the invariants live:
//!
//! - category-mode policy is enforced here, at operation entry — the
//!   storage ports never see modes;
//! - config-protected categories are refused deletion and description
//!   edits here;
//! - memory mutations write the file first, then update the index, so a
//!   crash in between leaves a stale index that `reindex` repairs, never a
//!   lost memory.
//!
//! Commands never print, never exit, and never touch a global clock: `now`
//! comes in as an argument wherever time matters.
//!
//! ## Operation modules
//!
//! - [`category`]: create / delete / describe categories
//! - [`create`]: create a memory
//! - [`get`]: load one memory
//! - [`update`]: patch a memory
//! - [`remove`]: delete a memory
//! - [`move_memory`]: relocate a memory, preserving `created_at`
//! - [`prune`]: sweep expired memories
//! - [`list`]: one category's listing
//! - [`recent`]: most recently updated memories, content included
//! - [`query`]: filtered index query
//! - [`stores`]: registry management and store initialization

use crate::error::{CortexError, Result};
use crate::model::CategoryMode;
use crate::path::CategoryPath;
use crate::store::ScopedAdapter;

pub mod category;
pub mod create;
pub mod get;
pub mod list;
pub mod move_memory;
pub mod prune;
pub mod query;
pub mod recent;
pub mod remove;
pub mod stores;
pub mod update;

/// Fail unless every ancestor category of `category` exists on disk.
/// Creating memories never auto-creates categories.
pub(crate) fn require_category(adapter: &ScopedAdapter, category: &CategoryPath) -> Result<()> {
    if category.is_root() {
        return Ok(());
    }
    if adapter.categories().exists(category)? {
        return Ok(());
    }
    Err(CortexError::CategoryNotFound {
        path: category.to_string(),
    })
}

/// Category-creation policy, fanned out by mode.
pub(crate) fn enforce_create_policy(adapter: &ScopedAdapter, path: &CategoryPath) -> Result<()> {
    match adapter.mode() {
        CategoryMode::Free => Ok(()),
        CategoryMode::Strict => Err(CortexError::CategoryModeForbidsCreate {
            mode: adapter.mode().to_string(),
            path: path.to_string(),
        }),
        CategoryMode::Subcategories => {
            let root = CategoryPath::from_segments(vec![path
                .root_segment()
                .expect("non-root path has a first segment")
                .clone()]);
            let declared = adapter
                .protected_categories()
                .iter()
                .any(|p| p.root_segment() == root.root_segment());
            if declared || adapter.categories().exists(&root)? {
                Ok(())
            } else {
                Err(CortexError::CategoryModeForbidsCreate {
                    mode: adapter.mode().to_string(),
                    path: path.to_string(),
                })
            }
        }
    }
}

/// Category-deletion policy: strict mode never deletes at runtime.
pub(crate) fn enforce_delete_policy(adapter: &ScopedAdapter) -> Result<()> {
    if adapter.mode() == CategoryMode::Strict {
        return Err(CortexError::CategoryModeForbidsDelete {
            mode: adapter.mode().to_string(),
        });
    }
    Ok(())
}

/// Refuse the operation when `path` or anything beneath it is declared in
/// the store config.
pub(crate) fn require_unprotected(
    adapter: &ScopedAdapter,
    path: &CategoryPath,
    action: &'static str,
) -> Result<()> {
    if adapter.is_protected(path) {
        return Err(CortexError::CategoryProtected {
            path: path.to_string(),
            action,
        });
    }
    if action == "deleted" {
        if let Some(shadowed) = adapter
            .protected_categories()
            .iter()
            .find(|p| p.starts_with(path))
        {
            return Err(CortexError::CategoryProtected {
                path: shadowed.to_string(),
                action,
            });
        }
    }
    Ok(())
}
