use crate::error::{CortexError, Result};
use crate::model::Memory;
use crate::path::MemoryPath;
use crate::store::ScopedAdapter;

/// Remove a memory. Unlike the storage port, this is *not* idempotent:
/// removing an absent memory is a user error and reports `MEMORY_NOT_FOUND`.
pub fn run(adapter: &ScopedAdapter, path: &MemoryPath) -> Result<Memory> {
    if !adapter.memories().exists(path)? {
        return Err(CortexError::MemoryNotFound {
            path: path.to_string(),
        });
    }
    let removed = adapter.memories().load(path)?;
    adapter.memories().remove(path)?;
    adapter.index().remove_entry(path)?;
    Ok(removed)
}
