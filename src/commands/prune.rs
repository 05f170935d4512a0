use crate::error::Result;
use crate::model::truncate_to_millis;
use crate::path::{CategoryPath, MemoryPath};
use crate::store::{QueryFilter, ScopedAdapter};
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct PruneOptions {
    pub dry_run: bool,
    pub now: DateTime<Utc>,
}

/// Outcome of a prune sweep.
#[derive(Debug, Default)]
pub struct PruneReport {
    pub pruned: Vec<MemoryPath>,
    pub errors: Vec<(MemoryPath, String)>,
}

/// Sweep memories whose `expires_at` has passed.
///
/// A dry run only reports. A real run removes each expired memory and then
/// runs a full reindex, so the projection ends up faithful even if some
/// surgical removals failed half-way.
pub fn run(adapter: &ScopedAdapter, options: PruneOptions) -> Result<PruneReport> {
    let now = truncate_to_millis(options.now);
    let mut filter = QueryFilter::at(now);
    filter.include_expired = true;
    let expired: Vec<MemoryPath> = adapter
        .index()
        .query(&filter)?
        .into_iter()
        .filter(|entry| entry.is_expired(now))
        .map(|entry| entry.path)
        .collect();

    let mut report = PruneReport::default();
    if options.dry_run {
        report.pruned = expired;
        return Ok(report);
    }

    for path in expired {
        match super::remove::run(adapter, &path) {
            Ok(_) => report.pruned.push(path),
            Err(err) => report.errors.push((path, err.to_string())),
        }
    }
    let reindex = adapter.index().reindex(&CategoryPath::root())?;
    debug!(
        pruned = report.pruned.len(),
        errors = report.errors.len(),
        reindexed = reindex.indexed,
        "prune complete"
    );
    Ok(report)
}
