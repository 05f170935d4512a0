use crate::error::Result;
use crate::model::Memory;
use crate::path::{CategoryPath, MemoryPath};
use crate::store::{QueryFilter, ScopedAdapter, SortBy, SortOrder};
use chrono::{DateTime, Utc};
use tracing::warn;

pub const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct RecentOptions {
    pub category: Option<CategoryPath>,
    pub limit: usize,
    pub include_expired: bool,
    pub now: DateTime<Utc>,
}

impl RecentOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        RecentOptions {
            category: None,
            limit: DEFAULT_LIMIT,
            include_expired: false,
            now,
        }
    }
}

/// A recency hit with its full content loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentMemory {
    pub path: MemoryPath,
    pub memory: Memory,
}

/// The most recently updated memories, newest first, content included.
/// Entries whose index row lost its `updated_at` (stale index) sort last.
pub fn run(adapter: &ScopedAdapter, options: RecentOptions) -> Result<Vec<RecentMemory>> {
    let mut filter = QueryFilter::at(options.now);
    filter.category = options.category;
    filter.include_expired = options.include_expired;
    filter.sort_by = SortBy::UpdatedAt;
    filter.sort_order = SortOrder::Desc;
    filter.limit = Some(options.limit);

    let mut out = Vec::new();
    for entry in adapter.index().query(&filter)? {
        match adapter.memories().load(&entry.path) {
            Ok(memory) => out.push(RecentMemory {
                path: entry.path,
                memory,
            }),
            // A row without a file is index staleness, not a caller error.
            Err(err) => warn!(path = %entry.path, %err, "skipping stale index row"),
        }
    }
    Ok(out)
}
