//! # API Facade
//!
//! [`CortexApi`] is the single entry point for embedding the engine. It is a
//! thin layer: it resolves which store to act on, parses string identifiers
//! into typed paths, stamps a clock, and dispatches to the command layer.
//! No business logic lives here, and nothing here writes to stdout or
//! assumes a terminal — the CLI and MCP front-ends are clients of this
//! facade, not part of it.
//!
//! The clock is injectable so hosts (and tests) control time; by default it
//! reads `Utc::now()`, truncated to the engine's millisecond precision.

use crate::commands;
use crate::config::{FileConfigStore, Settings, StoreDefinition};
use crate::error::Result;
use crate::model::{CategoryIndex, CategoryIndexEntry, Memory, MemoryDraft, MemoryPatch};
use crate::path::{CategoryPath, MemoryPath, Slug};
use crate::resolver::{self, ResolvedStore};
use crate::store::{ConfigStore, QueryFilter, ReindexReport, ScopedAdapter};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct CortexApi {
    config: FileConfigStore,
    cwd: PathBuf,
    clock: Clock,
}

impl CortexApi {
    /// Open against the default config directory and the process cwd.
    pub fn open_default() -> Result<Self> {
        let config = FileConfigStore::open_default()?;
        let cwd = std::env::current_dir()
            .map_err(|e| crate::error::CortexError::storage(PathBuf::from("."), e))?;
        Ok(CortexApi::new(config, cwd))
    }

    pub fn new(config: FileConfigStore, cwd: PathBuf) -> Self {
        CortexApi {
            config,
            cwd,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the clock; every operation stamps time through it.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Create the config directory and file when absent.
    pub fn initialize(&mut self) -> Result<()> {
        self.config.initialize()
    }

    pub fn settings(&self) -> Result<Settings> {
        self.config.settings()
    }

    /// Resolve a store (explicit name, local, or default) to a scoped
    /// adapter.
    pub fn adapter(&self, store: Option<&str>) -> Result<ScopedAdapter> {
        let explicit = store.map(Slug::parse).transpose()?;
        let ResolvedStore {
            root,
            scope,
            definition,
        } = resolver::resolve(&self.config, &self.cwd, explicit.as_ref())?;
        Ok(ScopedAdapter::open(root, &definition, &scope.label()))
    }

    // --- Memories ---

    pub fn create_memory(
        &self,
        store: Option<&str>,
        path: &str,
        draft: MemoryDraft,
    ) -> Result<Memory> {
        let adapter = self.adapter(store)?;
        commands::create::run(&adapter, &MemoryPath::parse(path)?, draft, self.now())
    }

    pub fn get_memory(&self, store: Option<&str>, path: &str) -> Result<Memory> {
        let adapter = self.adapter(store)?;
        commands::get::run(&adapter, &MemoryPath::parse(path)?)
    }

    pub fn update_memory(
        &self,
        store: Option<&str>,
        path: &str,
        patch: MemoryPatch,
    ) -> Result<Memory> {
        let adapter = self.adapter(store)?;
        commands::update::run(&adapter, &MemoryPath::parse(path)?, patch, self.now())
    }

    pub fn remove_memory(&self, store: Option<&str>, path: &str) -> Result<Memory> {
        let adapter = self.adapter(store)?;
        commands::remove::run(&adapter, &MemoryPath::parse(path)?)
    }

    pub fn move_memory(&self, store: Option<&str>, src: &str, dst: &str) -> Result<Memory> {
        let adapter = self.adapter(store)?;
        commands::move_memory::run(
            &adapter,
            &MemoryPath::parse(src)?,
            &MemoryPath::parse(dst)?,
            self.now(),
        )
    }

    pub fn prune(&self, store: Option<&str>, dry_run: bool) -> Result<commands::prune::PruneReport> {
        let adapter = self.adapter(store)?;
        commands::prune::run(
            &adapter,
            commands::prune::PruneOptions {
                dry_run,
                now: self.now(),
            },
        )
    }

    // --- Listing & queries ---

    pub fn list_memories(
        &self,
        store: Option<&str>,
        category: &str,
        include_expired: bool,
    ) -> Result<CategoryIndex> {
        let adapter = self.adapter(store)?;
        commands::list::run(
            &adapter,
            &CategoryPath::parse(category)?,
            commands::list::ListOptions {
                include_expired,
                now: self.now(),
            },
        )
    }

    pub fn recent_memories(
        &self,
        store: Option<&str>,
        category: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<commands::recent::RecentMemory>> {
        let adapter = self.adapter(store)?;
        let mut options = commands::recent::RecentOptions::at(self.now());
        options.category = category.map(CategoryPath::parse).transpose()?;
        if let Some(limit) = limit {
            options.limit = limit;
        }
        commands::recent::run(&adapter, options)
    }

    pub fn query(
        &self,
        store: Option<&str>,
        filter: &QueryFilter,
    ) -> Result<Vec<CategoryIndexEntry>> {
        let adapter = self.adapter(store)?;
        commands::query::run(&adapter, filter)
    }

    /// A query filter stamped with this API's clock.
    pub fn filter(&self) -> QueryFilter {
        QueryFilter::at(self.now())
    }

    // --- Categories ---

    pub fn create_category(
        &self,
        store: Option<&str>,
        path: &str,
    ) -> Result<commands::category::CategoryCreated> {
        let adapter = self.adapter(store)?;
        commands::category::create(&adapter, &CategoryPath::parse(path)?)
    }

    pub fn delete_category(
        &self,
        store: Option<&str>,
        path: &str,
        recursive: bool,
    ) -> Result<commands::category::CategoryDeleted> {
        let adapter = self.adapter(store)?;
        commands::category::delete(&adapter, &CategoryPath::parse(path)?, recursive)
    }

    pub fn set_category_description(
        &self,
        store: Option<&str>,
        path: &str,
        description: &str,
    ) -> Result<()> {
        let adapter = self.adapter(store)?;
        commands::category::set_description(&adapter, &CategoryPath::parse(path)?, description)
    }

    // --- Maintenance ---

    pub fn reindex(&self, store: Option<&str>) -> Result<ReindexReport> {
        let adapter = self.adapter(store)?;
        adapter.index().reindex(&CategoryPath::root())
    }

    // --- Store registry ---

    pub fn register_store(&mut self, name: &str, definition: StoreDefinition) -> Result<()> {
        let name = Slug::parse(name)?;
        commands::stores::register(&mut self.config, &name, definition)
    }

    pub fn unregister_store(&mut self, name: &str) -> Result<()> {
        let name = Slug::parse(name)?;
        commands::stores::unregister(&mut self.config, &name)
    }

    pub fn list_stores(&self) -> Result<Vec<(Slug, StoreDefinition)>> {
        commands::stores::list(&self.config)
    }

    /// Materialize a registered store on disk.
    pub fn init_store(&self, name: &str) -> Result<commands::stores::InitReport> {
        let name = Slug::parse(name)?;
        let definition = self.config.store(&name)?;
        commands::stores::init(&definition, name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_clock(secs: i64) -> Clock {
        Box::new(move || Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn api_with_store() -> (TempDir, TempDir, CortexApi) {
        let config_dir = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let config = FileConfigStore::open(config_dir.path()).unwrap();
        let mut api = CortexApi::new(config, PathBuf::from("/nonexistent-cwd"))
            .with_clock(fixed_clock(1_700_000_000));
        api.register_store("main", StoreDefinition::new(store_dir.path()))
            .unwrap();
        api.init_store("main").unwrap();
        (config_dir, store_dir, api)
    }

    #[test]
    fn end_to_end_create_list_get() {
        let (_c, _s, api) = api_with_store();
        api.create_category(Some("main"), "project").unwrap();
        let created = api
            .create_memory(
                Some("main"),
                "project/notes",
                MemoryDraft {
                    content: "hello".into(),
                    tags: vec!["a".into(), "a".into(), "b".into()],
                    source: "user".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(created.metadata.tags, vec!["a", "b"]);

        let listing = api.list_memories(Some("main"), "project", false).unwrap();
        assert_eq!(listing.memories.len(), 1);
        assert_eq!(listing.memories[0].path.to_string(), "project/notes");

        let loaded = api.get_memory(Some("main"), "project/notes").unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn invalid_paths_are_rejected_before_io() {
        let (_c, _s, api) = api_with_store();
        assert!(api.get_memory(Some("main"), "Bad/Path").is_err());
        assert!(api.create_category(Some("main"), "/abs").is_err());
        assert!(api.adapter(Some("Not A Slug")).is_err());
    }

    #[test]
    fn registry_surface_roundtrips() {
        let (_c, _s, mut api) = api_with_store();
        assert_eq!(api.list_stores().unwrap().len(), 1);
        api.unregister_store("main").unwrap();
        assert!(api.list_stores().unwrap().is_empty());
        assert!(api.adapter(Some("main")).is_err());
    }
}
