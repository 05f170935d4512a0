use crate::error::{CortexError, Result};
use crate::model::{truncate_to_millis, Memory};
use crate::path::MemoryPath;
use crate::store::ScopedAdapter;
use chrono::{DateTime, Utc};

/// Move a memory to a new path. Content, tags, citations and `created_at`
/// travel unchanged; `updated_at` is stamped with `now`. The destination
/// category chain must already exist.
pub fn run(
    adapter: &ScopedAdapter,
    src: &MemoryPath,
    dst: &MemoryPath,
    now: DateTime<Utc>,
) -> Result<Memory> {
    if src == dst {
        return Err(CortexError::InvalidPath {
            input: dst.to_string(),
            reason: "source and destination are the same path".to_string(),
        });
    }
    if adapter.memories().exists(dst)? {
        return Err(CortexError::MemoryAlreadyExists {
            path: dst.to_string(),
        });
    }
    super::require_category(adapter, dst.parent())?;

    let mut memory = adapter.memories().load(src)?;
    adapter.memories().rename(src, dst)?;
    memory.metadata.updated_at = truncate_to_millis(now).max(memory.metadata.updated_at);
    adapter.memories().save(dst, &memory)?;

    adapter.index().remove_entry(src)?;
    adapter.index().update_after_memory_write(dst, &memory, true)?;
    Ok(memory)
}
