use crate::error::Result;
use crate::model::{truncate_to_millis, CategoryIndex};
use crate::path::CategoryPath;
use crate::store::ScopedAdapter;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub include_expired: bool,
    pub now: DateTime<Utc>,
}

/// List one category: its direct memories and direct subcategories.
/// Expired memories are hidden unless asked for.
pub fn run(
    adapter: &ScopedAdapter,
    category: &CategoryPath,
    options: ListOptions,
) -> Result<CategoryIndex> {
    super::require_category(adapter, category)?;
    let mut index = adapter.index().load(category)?;
    if !options.include_expired {
        let now = truncate_to_millis(options.now);
        index.memories.retain(|m| !m.is_expired(now));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create;
    use crate::error::ErrorCode;
    use crate::model::{CategoryMode, MemoryDraft};
    use crate::path::MemoryPath;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn options(now: i64) -> ListOptions {
        ListOptions {
            include_expired: false,
            now: t(now),
        }
    }

    #[test]
    fn empty_store_lists_empty_root() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        let listing = run(&adapter, &CategoryPath::root(), options(0)).unwrap();
        assert!(listing.memories.is_empty());
        assert!(listing.subcategories.is_empty());
    }

    #[test]
    fn root_lists_top_level_subcategories() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        adapter
            .categories()
            .ensure(&CategoryPath::parse("project").unwrap())
            .unwrap();
        create::run(
            &adapter,
            &MemoryPath::parse("project/n").unwrap(),
            MemoryDraft {
                content: "x".into(),
                source: "user".into(),
                ..Default::default()
            },
            t(1),
        )
        .unwrap();

        let listing = run(&adapter, &CategoryPath::root(), options(10)).unwrap();
        assert!(listing.memories.is_empty());
        assert_eq!(listing.subcategories.len(), 1);
        assert_eq!(listing.subcategories[0].path.to_string(), "project");
    }

    #[test]
    fn expired_memories_are_hidden_by_default() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        adapter
            .categories()
            .ensure(&CategoryPath::parse("a").unwrap())
            .unwrap();
        create::run(
            &adapter,
            &MemoryPath::parse("a/ephemeral").unwrap(),
            MemoryDraft {
                content: "x".into(),
                source: "user".into(),
                expires_at: Some(t(100)),
                ..Default::default()
            },
            t(1),
        )
        .unwrap();

        let category = CategoryPath::parse("a").unwrap();
        assert!(run(&adapter, &category, options(200)).unwrap().memories.is_empty());

        let mut with_expired = options(200);
        with_expired.include_expired = true;
        assert_eq!(run(&adapter, &category, with_expired).unwrap().memories.len(), 1);
    }

    #[test]
    fn missing_category_is_not_found() {
        let adapter = ScopedAdapter::in_memory(CategoryMode::Free, vec![]);
        let err = run(&adapter, &CategoryPath::parse("ghost").unwrap(), options(0)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CategoryNotFound);
    }
}
