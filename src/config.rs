//! # Configuration
//!
//! The config file (`<config-dir>/config.yaml`) is a single YAML document
//! holding user settings and the registry of named stores. [`FileConfigStore`]
//! is the production implementation of the [`ConfigStore`] and
//! [`StoreRegistry`] ports; it loads one immutable snapshot and persists
//! registry mutations with the same atomic-rename discipline as memory files.
//!
//! Environment overrides: `CORTEX_CONFIG_DIR` relocates the config directory,
//! `CORTEX_DEFAULT_STORE` overrides `settings.default_store`.

use crate::error::{CortexError, Result};
use crate::model::CategoryMode;
use crate::path::{CategoryPath, Slug};
use crate::store::{fs::write_atomic, ConfigStore, StoreRegistry};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "config.yaml";
pub const ENV_CONFIG_DIR: &str = "CORTEX_CONFIG_DIR";
pub const ENV_DEFAULT_STORE: &str = "CORTEX_DEFAULT_STORE";

/// Physical layout of a store's derived index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexLayout {
    /// One `cortex.db` at the store root, WAL journal mode.
    #[default]
    Sqlite,
    /// One `index.yaml` per non-empty category. Back-compat only.
    Yaml,
}

/// One node of the config-declared category tree. `path` is relative to the
/// parent node and may span several segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDecl {
    pub path: CategoryPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<CategoryDecl>,
}

/// Registry entry for one named store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDefinition {
    /// Filesystem root hosting the memory tree.
    pub path: PathBuf,
    #[serde(default)]
    pub category_mode: CategoryMode,
    #[serde(default)]
    pub index_layout: IndexLayout,
    /// Declared categories; protected from deletion and description edits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryDecl>,
}

impl StoreDefinition {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreDefinition {
            path: path.into(),
            category_mode: CategoryMode::default(),
            index_layout: IndexLayout::default(),
            categories: Vec::new(),
        }
    }

    /// Flatten the declared tree into absolute category paths.
    pub fn protected_categories(&self) -> Vec<CategoryPath> {
        self.declared_categories()
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    /// Flatten the declared tree into `(path, description)` pairs, parents
    /// before children.
    pub fn declared_categories(&self) -> Vec<(CategoryPath, Option<String>)> {
        fn visit(
            parent: &CategoryPath,
            nodes: &[CategoryDecl],
            out: &mut Vec<(CategoryPath, Option<String>)>,
        ) {
            for node in nodes {
                let mut path = parent.clone();
                for segment in node.path.segments() {
                    path = path.join(segment.clone());
                }
                // A node with an empty path resolves to its parent; it can
                // scope children but is not itself a declared category.
                if !path.is_root() {
                    out.push((path.clone(), node.description.clone()));
                }
                visit(&path, &node.subcategories, out);
            }
        }
        let mut out = Vec::new();
        visit(&CategoryPath::root(), &self.categories, &mut out);
        out
    }
}

/// User-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Preferred rendering for front-ends; the engine passes it through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_store: Option<Slug>,
    /// When set, refuse to fall back to the default store if no local store
    /// exists. Both the historical `strictLocal` spelling and the canonical
    /// `strict_local` are accepted on load.
    #[serde(default, alias = "strictLocal")]
    pub strict_local: bool,
}

/// The whole config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CortexConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub stores: BTreeMap<Slug, StoreDefinition>,
}

/// Resolve the config directory: `CORTEX_CONFIG_DIR` when set, otherwise the
/// platform-conventional user config directory.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    ProjectDirs::from("dev", "cortex", "cortex")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| CortexError::Config {
            path: PathBuf::new(),
            reason: "could not determine a config directory; set CORTEX_CONFIG_DIR".to_string(),
        })
}

/// File-backed config snapshot plus registry mutations.
#[derive(Debug)]
pub struct FileConfigStore {
    dir: PathBuf,
    config: CortexConfig,
}

impl FileConfigStore {
    /// Load from the default config directory.
    pub fn open_default() -> Result<Self> {
        Self::open(config_dir()?)
    }

    /// Load from an explicit directory. A missing file reads as the default
    /// config; a malformed file is an error, not a silent reset.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let file = dir.join(CONFIG_FILENAME);
        let mut config = if file.exists() {
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| CortexError::storage(file.clone(), e))?;
            serde_yaml::from_str(&raw).map_err(|e| CortexError::Config {
                path: file.clone(),
                reason: e.to_string(),
            })?
        } else {
            CortexConfig::default()
        };

        if let Ok(name) = std::env::var(ENV_DEFAULT_STORE) {
            if !name.is_empty() {
                let slug = Slug::parse(&name).map_err(|e| CortexError::Config {
                    path: file.clone(),
                    reason: format!("{ENV_DEFAULT_STORE}: {e}"),
                })?;
                config.settings.default_store = Some(slug);
            }
        }

        Ok(FileConfigStore { dir, config })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &CortexConfig {
        &self.config
    }

    fn persist(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| CortexError::storage(self.dir.clone(), e))?;
        let file = self.dir.join(CONFIG_FILENAME);
        let raw = serde_yaml::to_string(&self.config).map_err(|e| CortexError::Config {
            path: file.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&file, raw.as_bytes())
    }
}

impl ConfigStore for FileConfigStore {
    fn initialize(&mut self) -> Result<()> {
        let file = self.dir.join(CONFIG_FILENAME);
        if !file.exists() {
            self.persist()?;
        }
        Ok(())
    }

    fn settings(&self) -> Result<Settings> {
        Ok(self.config.settings.clone())
    }

    fn store(&self, name: &Slug) -> Result<StoreDefinition> {
        self.config
            .stores
            .get(name)
            .cloned()
            .ok_or_else(|| CortexError::StoreNotFound {
                name: name.to_string(),
            })
    }

    fn store_names(&self) -> Result<Vec<Slug>> {
        Ok(self.config.stores.keys().cloned().collect())
    }
}

impl StoreRegistry for FileConfigStore {
    fn load(&self, name: &Slug) -> Result<StoreDefinition> {
        self.store(name)
    }

    fn add(&mut self, name: &Slug, definition: StoreDefinition) -> Result<()> {
        if self.config.stores.contains_key(name) {
            return Err(CortexError::StoreAlreadyExists {
                name: name.to_string(),
            });
        }
        self.config.stores.insert(name.clone(), definition);
        self.persist()
    }

    fn save(&mut self, name: &Slug, definition: StoreDefinition) -> Result<()> {
        self.config.stores.insert(name.clone(), definition);
        self.persist()
    }

    fn remove(&mut self, name: &Slug) -> Result<()> {
        if self.config.stores.remove(name).is_none() {
            return Err(CortexError::StoreNotFound {
                name: name.to_string(),
            });
        }
        self.persist()
    }

    fn list(&self) -> Result<Vec<(Slug, StoreDefinition)>> {
        Ok(self
            .config
            .stores
            .iter()
            .map(|(name, def)| (name.clone(), def.clone()))
            .collect())
    }
}
