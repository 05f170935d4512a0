use crate::error::Result;
use crate::model::CategoryIndexEntry;
use crate::store::{QueryFilter, ScopedAdapter};

/// Filtered index query. Returns index rows only; use [`recent`] or [`get`]
/// to load content.
///
/// [`recent`]: super::recent
/// [`get`]: super::get
pub fn run(adapter: &ScopedAdapter, filter: &QueryFilter) -> Result<Vec<CategoryIndexEntry>> {
    adapter.index().query(filter)
}
