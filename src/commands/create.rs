use crate::error::Result;
use crate::model::{Memory, MemoryDraft};
use crate::path::MemoryPath;
use crate::store::ScopedAdapter;
use chrono::{DateTime, Utc};

/// Create a memory at `path`. Every ancestor category must already exist;
/// the operation never creates categories on the side.
pub fn run(
    adapter: &ScopedAdapter,
    path: &MemoryPath,
    draft: MemoryDraft,
    now: DateTime<Utc>,
) -> Result<Memory> {
    super::require_category(adapter, path.parent())?;
    let memory = Memory::new(draft, now)?;
    adapter.memories().add(path, &memory)?;
    adapter.index().update_after_memory_write(path, &memory, true)?;
    Ok(memory)
}
