use crate::error::Result;
use crate::model::{Memory, MemoryPatch};
use crate::path::MemoryPath;
use crate::store::ScopedAdapter;
use chrono::{DateTime, Utc};

/// Patch an existing memory. Present fields replace entirely; omitted
/// fields keep their values; `expires_at` is tri-state (keep/clear/set).
pub fn run(
    adapter: &ScopedAdapter,
    path: &MemoryPath,
    patch: MemoryPatch,
    now: DateTime<Utc>,
) -> Result<Memory> {
    let mut memory = adapter.memories().load(path)?;
    memory.apply(patch, now)?;
    adapter.memories().save(path, &memory)?;
    adapter.index().update_after_memory_write(path, &memory, true)?;
    Ok(memory)
}
