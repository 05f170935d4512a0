use crate::error::Result;
use crate::model::Memory;
use crate::path::MemoryPath;
use crate::store::ScopedAdapter;

/// Load one memory, frontmatter and body.
pub fn run(adapter: &ScopedAdapter, path: &MemoryPath) -> Result<Memory> {
    adapter.memories().load(path)
}
