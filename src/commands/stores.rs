use crate::config::StoreDefinition;
use crate::error::Result;
use crate::path::{CategoryPath, Slug};
use crate::store::{ScopedAdapter, StoreRegistry};
use std::path::PathBuf;
use tracing::debug;

/// Register a named store. The name is already a validated [`Slug`];
/// duplicates are a conflict.
pub fn register(
    registry: &mut dyn StoreRegistry,
    name: &Slug,
    definition: StoreDefinition,
) -> Result<()> {
    registry.add(name, definition)
}

/// Remove a store from the registry. The store's files are left alone;
/// unregistering is not deletion.
pub fn unregister(registry: &mut dyn StoreRegistry, name: &Slug) -> Result<()> {
    registry.remove(name)
}

pub fn list(registry: &dyn StoreRegistry) -> Result<Vec<(Slug, StoreDefinition)>> {
    registry.list()
}

/// Result of [`init`].
#[derive(Debug)]
pub struct InitReport {
    pub root: PathBuf,
    pub created_categories: Vec<CategoryPath>,
}

/// Materialize a store on disk: the root directory, the config-declared
/// category directories, their descriptions, and a fresh index. Idempotent;
/// re-running against an existing store only fills in what is missing.
pub fn init(definition: &StoreDefinition, label: &str) -> Result<InitReport> {
    std::fs::create_dir_all(&definition.path)
        .map_err(|e| crate::error::CortexError::storage(definition.path.clone(), e))?;
    let adapter = ScopedAdapter::open(definition.path.clone(), definition, label);

    // Index whatever already lives in the root before adding the declared
    // categories, so freshly created (still empty) ones keep their entries.
    let report = adapter.index().reindex(&CategoryPath::root())?;
    debug!(root = %definition.path.display(), indexed = report.indexed, "store initialized");

    let mut created = Vec::new();
    for (path, description) in definition.declared_categories() {
        if adapter.categories().ensure(&path)? {
            created.push(path.clone());
        }
        if let Some(description) = description {
            let parent = path.parent().expect("declared categories are non-root");
            let child = path
                .segments()
                .last()
                .expect("declared categories are non-root");
            adapter
                .categories()
                .update_subcategory_description(&parent, child, &description)?;
        }
    }

    Ok(InitReport {
        root: definition.path.clone(),
        created_categories: created,
    })
}
