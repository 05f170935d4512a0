//! # Store Resolution
//!
//! Which store does an operation act on? Three answers, tried in order:
//!
//! 1. An explicit store name — must be registered, or the call fails.
//! 2. A local store: `<cwd>/.cortex/memory`, when that directory exists.
//!    Local stores opt in per project, like a repository-level dotdir.
//! 3. The configured default store. When `strict_local` is set the fallback
//!    is disabled and the absence of a local store is an error.
//!
//! Resolution returns an absolute, canonicalized root plus a scope label so
//! front-ends can tell the user *which* store they just wrote to.

use crate::config::StoreDefinition;
use crate::error::{CortexError, Result};
use crate::path::Slug;
use crate::store::ConfigStore;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory chain that marks a local store.
pub const LOCAL_STORE_DIR: &str = ".cortex/memory";

/// How the store was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreScope {
    Explicit(Slug),
    Local,
    Default(Slug),
}

impl StoreScope {
    pub fn label(&self) -> String {
        match self {
            StoreScope::Explicit(name) => name.to_string(),
            StoreScope::Local => "local".to_string(),
            StoreScope::Default(name) => name.to_string(),
        }
    }
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A resolved store: canonical root, scope, and the definition to open the
/// adapter with.
#[derive(Debug, Clone)]
pub struct ResolvedStore {
    pub root: PathBuf,
    pub scope: StoreScope,
    pub definition: StoreDefinition,
}

pub fn resolve(
    config: &dyn ConfigStore,
    cwd: &Path,
    explicit: Option<&Slug>,
) -> Result<ResolvedStore> {
    if let Some(name) = explicit {
        let definition = config.store(name)?;
        return Ok(ResolvedStore {
            root: canonical(&definition.path),
            scope: StoreScope::Explicit(name.clone()),
            definition,
        });
    }

    let local_root = cwd.join(LOCAL_STORE_DIR);
    if local_root.is_dir() {
        return Ok(ResolvedStore {
            root: canonical(&local_root),
            scope: StoreScope::Local,
            definition: StoreDefinition::new(local_root),
        });
    }

    let settings = config.settings()?;
    if settings.strict_local {
        return Err(CortexError::LocalStoreMissing {
            cwd: cwd.display().to_string(),
        });
    }

    let name = settings
        .default_store
        .ok_or(CortexError::GlobalStoreMissing)?;
    let definition = config.store(&name)?;
    Ok(ResolvedStore {
        root: canonical(&definition.path),
        scope: StoreScope::Default(name),
        definition,
    })
}

/// Canonicalize when the path exists; otherwise pass it through unchanged
/// (a registered store may not be initialized yet).
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfigStore, CONFIG_FILENAME};
    use crate::error::ErrorCode;
    use crate::store::StoreRegistry;
    use tempfile::TempDir;

    fn slug(s: &str) -> Slug {
        Slug::parse(s).unwrap()
    }

    fn config_with(yaml: &str) -> (TempDir, FileConfigStore) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), yaml).unwrap();
        let store = FileConfigStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn explicit_name_wins_over_local() {
        let cwd = TempDir::new().unwrap();
        std::fs::create_dir_all(cwd.path().join(LOCAL_STORE_DIR)).unwrap();
        let dir = TempDir::new().unwrap();
        let mut config = FileConfigStore::open(dir.path()).unwrap();
        config
            .add(&slug("work"), StoreDefinition::new("/srv/work"))
            .unwrap();

        let resolved = resolve(&config, cwd.path(), Some(&slug("work"))).unwrap();
        assert_eq!(resolved.scope, StoreScope::Explicit(slug("work")));
        assert_eq!(resolved.root, PathBuf::from("/srv/work"));
    }

    #[test]
    fn unregistered_explicit_name_fails() {
        let dir = TempDir::new().unwrap();
        let config = FileConfigStore::open(dir.path()).unwrap();
        let err = resolve(&config, Path::new("/"), Some(&slug("ghost"))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreNotFound);
    }

    #[test]
    fn local_store_is_found_and_canonicalized() {
        let cwd = TempDir::new().unwrap();
        std::fs::create_dir_all(cwd.path().join(LOCAL_STORE_DIR)).unwrap();
        let dir = TempDir::new().unwrap();
        let config = FileConfigStore::open(dir.path()).unwrap();

        let resolved = resolve(&config, cwd.path(), None).unwrap();
        assert_eq!(resolved.scope, StoreScope::Local);
        assert!(resolved.root.is_absolute());
        assert!(resolved.root.ends_with("memory"));
    }

    #[test]
    fn strict_local_fails_without_local_store() {
        let (_dir, config) = config_with("settings:\n  strict_local: true\n");
        let cwd = TempDir::new().unwrap();
        let err = resolve(&config, cwd.path(), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LocalStoreMissing);
    }

    #[test]
    fn falls_back_to_default_store() {
        let (_dir, config) = config_with(
            "settings:\n  default_store: personal\nstores:\n  personal:\n    path: /srv/personal\n",
        );
        let cwd = TempDir::new().unwrap();
        let resolved = resolve(&config, cwd.path(), None).unwrap();
        assert_eq!(resolved.scope, StoreScope::Default(slug("personal")));
        assert_eq!(resolved.root, PathBuf::from("/srv/personal"));
    }

    #[test]
    fn no_default_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = FileConfigStore::open(dir.path()).unwrap();
        let cwd = TempDir::new().unwrap();
        let err = resolve(&config, cwd.path(), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GlobalStoreMissing);
    }
}
