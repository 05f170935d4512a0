use crate::error::{CortexError, Result};
use crate::model::validate_description;
use crate::path::CategoryPath;
use crate::store::{QueryFilter, ScopedAdapter};
use chrono::{DateTime, Utc};

/// Result of [`create`].
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCreated {
    pub path: CategoryPath,
    /// False when the category already existed (creation is idempotent).
    pub created: bool,
}

/// Result of [`delete`].
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDeleted {
    pub path: CategoryPath,
    pub removed_memories: usize,
}

/// Create a category. Mode policy applies: `free` always allows it,
/// `subcategories` only under an established root, `strict` never.
pub fn create(adapter: &ScopedAdapter, path: &CategoryPath) -> Result<CategoryCreated> {
    if path.is_root() {
        return Err(CortexError::RootCategory { action: "created" });
    }
    super::enforce_create_policy(adapter, path)?;
    if adapter.categories().exists(path)? {
        return Ok(CategoryCreated {
            path: path.clone(),
            created: false,
        });
    }
    adapter.categories().ensure(path)?;
    Ok(CategoryCreated {
        path: path.clone(),
        created: true,
    })
}

/// Delete a category and, when `recursive`, everything beneath it.
/// Config-declared categories are protected regardless of mode.
pub fn delete(
    adapter: &ScopedAdapter,
    path: &CategoryPath,
    recursive: bool,
) -> Result<CategoryDeleted> {
    if path.is_root() {
        return Err(CortexError::RootCategory { action: "deleted" });
    }
    super::require_unprotected(adapter, path, "deleted")?;
    super::enforce_delete_policy(adapter)?;
    if !adapter.categories().exists(path)? {
        return Err(CortexError::CategoryNotFound {
            path: path.to_string(),
        });
    }

    // Count what goes away while the index still knows about it. Expired
    // entries are included, so the instant passed here is irrelevant.
    let mut filter = QueryFilter::at(DateTime::<Utc>::MIN_UTC);
    filter.category = Some(path.clone());
    filter.include_expired = true;
    let removed_memories = adapter.index().query(&filter)?.len();

    adapter.categories().delete(path, recursive)?;
    adapter.index().remove_category(path)?;
    Ok(CategoryDeleted {
        path: path.clone(),
        removed_memories,
    })
}

/// Set the description shown on the parent's subcategory entry.
/// Config-declared categories keep their configured description.
pub fn set_description(
    adapter: &ScopedAdapter,
    path: &CategoryPath,
    description: &str,
) -> Result<()> {
    if path.is_root() {
        return Err(CortexError::RootCategory { action: "described" });
    }
    super::require_unprotected(adapter, path, "described")?;
    let description = validate_description(description)?;
    if !adapter.categories().exists(path)? {
        return Err(CortexError::CategoryNotFound {
            path: path.to_string(),
        });
    }
    let parent = path.parent().expect("non-root path has a parent");
    let child = path
        .segments()
        .last()
        .expect("non-root path has a final segment");
    adapter
        .categories()
        .update_subcategory_description(&parent, child, &description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create as create_memory;
    use crate::error::ErrorCode;
    use crate::model::{CategoryMode, MemoryDraft, MAX_DESCRIPTION_LEN};
    use crate::path::MemoryPath;
    use chrono::TimeZone;

    fn cp(s: &str) -> CategoryPath {
        CategoryPath::parse(s).unwrap()
    }

    fn seed_memory(adapter: &ScopedAdapter, path: &str) {
        let path = MemoryPath::parse(path).unwrap();
        adapter.categories().ensure(path.parent()).unwrap();
        create_memory::run(
            adapter,
            &path,
            MemoryDraft {
                content: "x".into(),
                source: "user".into(),
                ..Default::default()
            },
            Utc.timestamp_opt(1, 0).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn free_mode_creates_and_is_idempotent() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        let first = create(&adapter, &cp("a/b")).unwrap();
        assert!(first.created);
        let second = create(&adapter, &cp("a/b")).unwrap();
        assert!(!second.created);
        assert!(adapter.categories().exists(&cp("a/b")).unwrap());
    }

    #[test]
    fn create_emits_entries_in_ancestor_indexes() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        create(&adapter, &cp("a/b")).unwrap();
        let root = adapter.index().load(&CategoryPath::root()).unwrap();
        assert_eq!(root.subcategories[0].path, cp("a"));
        let a = adapter.index().load(&cp("a")).unwrap();
        assert_eq!(a.subcategories[0].path, cp("a/b"));
    }

    #[test]
    fn subcategories_mode_gates_on_the_root_segment() {
        let adapter =
            ScopedAdapter::in_memory(CategoryMode::Subcategories, vec![cp("standards")]);
        // Nesting under a declared root is allowed.
        create(&adapter, &cp("standards/rust")).unwrap();
        // Nesting under an on-disk root is allowed.
        adapter.categories().ensure(&cp("scratch")).unwrap();
        create(&adapter, &cp("scratch/ideas")).unwrap();
        // A brand-new root is not.
        let err = create(&adapter, &cp("novel")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryModeForbidsCreate);
    }

    #[test]
    fn strict_mode_blocks_create_even_for_declared_names() {
        let adapter = ScopedAdapter::in_memory(
            CategoryMode::Strict,
            vec![cp("standards"), cp("decisions")],
        );
        let err = create(&adapter, &cp("standards/new")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryModeForbidsCreate);

        // And the memory path that depends on it cannot be reached.
        let err = create_memory::run(
            &adapter,
            &MemoryPath::parse("standards/new/m").unwrap(),
            MemoryDraft {
                content: "x".into(),
                source: "user".into(),
                ..Default::default()
            },
            Utc.timestamp_opt(1, 0).unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryNotFound);
    }

    #[test]
    fn strict_mode_blocks_delete() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Strict, vec![]);
        let err = delete(&adapter, &cp("anything"), false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryModeForbidsDelete);
    }

    #[test]
    fn protected_categories_cannot_be_deleted_in_any_mode() {
        for mode in [CategoryMode::Free, CategoryMode::Subcategories, CategoryMode::Strict] {
            let adapter = ScopedAdapter::in_memory(mode, vec![cp("standards")]);
            adapter.categories().ensure(&cp("standards")).unwrap();
            let err = delete(&adapter, &cp("standards"), true).unwrap_err();
            assert_eq!(err.code(), ErrorCode::CategoryProtected, "mode {mode}");
        }
    }

    #[test]
    fn deleting_an_ancestor_of_a_protected_category_is_refused() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![cp("a/b")]);
        adapter.categories().ensure(&cp("a/b")).unwrap();
        let err = delete(&adapter, &cp("a"), true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryProtected);
    }

    #[test]
    fn non_recursive_delete_of_non_empty_fails() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        seed_memory(&adapter, "a/n");
        let err = delete(&adapter, &cp("a"), false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryNotEmpty);
    }

    #[test]
    fn recursive_delete_takes_subtree_and_projection() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        seed_memory(&adapter, "a/n");
        seed_memory(&adapter, "a/b/deep");

        let result = delete(&adapter, &cp("a"), true).unwrap();
        assert_eq!(result.removed_memories, 2);
        assert!(!adapter.categories().exists(&cp("a")).unwrap());
        assert!(!adapter
            .memories()
            .exists(&MemoryPath::parse("a/b/deep").unwrap())
            .unwrap());
        let root = adapter.index().load(&CategoryPath::root()).unwrap();
        assert!(root.subcategories.is_empty());
    }

    #[test]
    fn delete_missing_category_is_not_found() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        let err = delete(&adapter, &cp("ghost"), false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryNotFound);
    }

    #[test]
    fn description_is_stored_on_the_parent_entry() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        create(&adapter, &cp("a/b")).unwrap();
        set_description(&adapter, &cp("a/b"), "  design notes  ").unwrap();
        let a = adapter.index().load(&cp("a")).unwrap();
        assert_eq!(a.subcategories[0].description.as_deref(), Some("design notes"));
    }

    #[test]
    fn description_bounds_are_enforced() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        create(&adapter, &cp("a")).unwrap();
        let err = set_description(&adapter, &cp("a"), "   ").unwrap_err();
        assert_eq!(err.code(), ErrorCode::DescriptionEmpty);
        let err =
            set_description(&adapter, &cp("a"), &"d".repeat(MAX_DESCRIPTION_LEN + 1)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DescriptionTooLong);
    }

    #[test]
    fn protected_descriptions_cannot_be_edited() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![cp("standards")]);
        adapter.categories().ensure(&cp("standards")).unwrap();
        let err = set_description(&adapter, &cp("standards"), "new").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryProtected);
    }
}
