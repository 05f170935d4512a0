use std::path::PathBuf;
use thiserror::Error;

/// Stable discriminants for the error taxonomy.
///
/// Front-ends key their behavior off these rather than matching on error
/// variants: the CLI maps `Invalid*` codes to usage-style failures and
/// everything in the storage family to a single `STORAGE_ERROR`; the MCP
/// surface forwards the code verbatim in its structured error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Identity & validation
    InvalidSlug,
    InvalidPath,
    InvalidTimestamp,
    InvalidTags,
    InvalidSource,
    MissingFrontmatter,
    InvalidFrontmatter,
    DescriptionTooLong,
    DescriptionEmpty,
    // Not found
    MemoryNotFound,
    CategoryNotFound,
    StoreNotFound,
    LocalStoreMissing,
    GlobalStoreMissing,
    // Conflict
    MemoryAlreadyExists,
    StoreAlreadyExists,
    // Policy
    CategoryModeForbidsCreate,
    CategoryModeForbidsDelete,
    CategoryNotEmpty,
    CategoryProtected,
    RootCategory,
    // Storage I/O
    StorageError,
    IndexError,
    // Config
    ConfigError,
}

impl ErrorCode {
    /// Wire representation used by the CLI and MCP collaborators.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidSlug => "INVALID_SLUG",
            ErrorCode::InvalidPath => "INVALID_PATH",
            ErrorCode::InvalidTimestamp => "INVALID_TIMESTAMP",
            ErrorCode::InvalidTags => "INVALID_TAGS",
            ErrorCode::InvalidSource => "INVALID_SOURCE",
            ErrorCode::MissingFrontmatter => "MISSING_FRONTMATTER",
            ErrorCode::InvalidFrontmatter => "INVALID_FRONTMATTER",
            ErrorCode::DescriptionTooLong => "DESCRIPTION_TOO_LONG",
            ErrorCode::DescriptionEmpty => "DESCRIPTION_EMPTY",
            ErrorCode::MemoryNotFound => "MEMORY_NOT_FOUND",
            ErrorCode::CategoryNotFound => "CATEGORY_NOT_FOUND",
            ErrorCode::StoreNotFound => "STORE_NOT_FOUND",
            ErrorCode::LocalStoreMissing => "LOCAL_STORE_MISSING",
            ErrorCode::GlobalStoreMissing => "GLOBAL_STORE_MISSING",
            ErrorCode::MemoryAlreadyExists => "MEMORY_ALREADY_EXISTS",
            ErrorCode::StoreAlreadyExists => "STORE_ALREADY_EXISTS",
            ErrorCode::CategoryModeForbidsCreate => "CATEGORY_MODE_FORBIDS_CREATE",
            ErrorCode::CategoryModeForbidsDelete => "CATEGORY_MODE_FORBIDS_DELETE",
            ErrorCode::CategoryNotEmpty => "CATEGORY_NOT_EMPTY",
            ErrorCode::CategoryProtected => "CATEGORY_PROTECTED",
            ErrorCode::RootCategory => "ROOT_CATEGORY",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::IndexError => "INDEX_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the cortex engine.
///
/// Validation and policy failures carry the offending value so messages can
/// name it; storage failures wrap their cause for debugging. Errors are
/// values all the way up — nothing in the engine panics on bad input.
#[derive(Error, Debug)]
pub enum CortexError {
    #[error("invalid slug '{input}': {reason}")]
    InvalidSlug { input: String, reason: String },

    #[error("invalid path '{input}': {reason}")]
    InvalidPath { input: String, reason: String },

    #[error("invalid timestamp in '{field}': '{value}' is not ISO-8601")]
    InvalidTimestamp { field: String, value: String },

    #[error("invalid tags: {reason}")]
    InvalidTags { reason: String },

    #[error("invalid source: must be a non-empty string")]
    InvalidSource,

    #[error("memory file '{path}' is missing its frontmatter block ('---' fences)")]
    MissingFrontmatter { path: String },

    #[error("malformed frontmatter in '{path}': {reason}")]
    InvalidFrontmatter { path: String, reason: String },

    #[error("description is {len} characters; the maximum is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("description must be non-empty after trimming")]
    DescriptionEmpty,

    #[error("memory '{path}' not found")]
    MemoryNotFound { path: String },

    #[error("category '{path}' not found; create it first with create_category")]
    CategoryNotFound { path: String },

    #[error("store '{name}' is not registered; add it to the config first")]
    StoreNotFound { name: String },

    #[error("no local store at '{cwd}/.cortex/memory' and strict_local is set")]
    LocalStoreMissing { cwd: String },

    #[error("no default store is configured; set settings.default_store or pass a store name")]
    GlobalStoreMissing,

    #[error("memory '{path}' already exists; use update_memory to change it")]
    MemoryAlreadyExists { path: String },

    #[error("store '{name}' is already registered")]
    StoreAlreadyExists { name: String },

    #[error("category mode '{mode}' forbids creating '{path}'")]
    CategoryModeForbidsCreate { mode: String, path: String },

    #[error("category mode '{mode}' forbids deleting categories")]
    CategoryModeForbidsDelete { mode: String },

    #[error("category '{path}' is not empty; pass recursive to delete it anyway")]
    CategoryNotEmpty { path: String },

    #[error("category '{path}' is declared in the store config and cannot be {action}")]
    CategoryProtected { path: String, action: &'static str },

    #[error("the root category cannot be {action}")]
    RootCategory { action: &'static str },

    #[error("storage failure at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index failure: {context}")]
    Index {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("config failure at '{path}': {reason}")]
    Config { path: PathBuf, reason: String },
}

impl CortexError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CortexError::InvalidSlug { .. } => ErrorCode::InvalidSlug,
            CortexError::InvalidPath { .. } => ErrorCode::InvalidPath,
            CortexError::InvalidTimestamp { .. } => ErrorCode::InvalidTimestamp,
            CortexError::InvalidTags { .. } => ErrorCode::InvalidTags,
            CortexError::InvalidSource => ErrorCode::InvalidSource,
            CortexError::MissingFrontmatter { .. } => ErrorCode::MissingFrontmatter,
            CortexError::InvalidFrontmatter { .. } => ErrorCode::InvalidFrontmatter,
            CortexError::DescriptionTooLong { .. } => ErrorCode::DescriptionTooLong,
            CortexError::DescriptionEmpty => ErrorCode::DescriptionEmpty,
            CortexError::MemoryNotFound { .. } => ErrorCode::MemoryNotFound,
            CortexError::CategoryNotFound { .. } => ErrorCode::CategoryNotFound,
            CortexError::StoreNotFound { .. } => ErrorCode::StoreNotFound,
            CortexError::LocalStoreMissing { .. } => ErrorCode::LocalStoreMissing,
            CortexError::GlobalStoreMissing => ErrorCode::GlobalStoreMissing,
            CortexError::MemoryAlreadyExists { .. } => ErrorCode::MemoryAlreadyExists,
            CortexError::StoreAlreadyExists { .. } => ErrorCode::StoreAlreadyExists,
            CortexError::CategoryModeForbidsCreate { .. } => ErrorCode::CategoryModeForbidsCreate,
            CortexError::CategoryModeForbidsDelete { .. } => ErrorCode::CategoryModeForbidsDelete,
            CortexError::CategoryNotEmpty { .. } => ErrorCode::CategoryNotEmpty,
            CortexError::CategoryProtected { .. } => ErrorCode::CategoryProtected,
            CortexError::RootCategory { .. } => ErrorCode::RootCategory,
            CortexError::Storage { .. } => ErrorCode::StorageError,
            CortexError::Index { .. } => ErrorCode::IndexError,
            CortexError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CortexError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Wrap an index-layer failure (SQLite or YAML codec) with context.
    pub fn index(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CortexError::Index {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn index_msg(context: impl Into<String>) -> Self {
        CortexError::Index {
            context: context.into(),
            source: None,
        }
    }
}

impl From<rusqlite::Error> for CortexError {
    fn from(err: rusqlite::Error) -> Self {
        CortexError::index("sqlite operation failed", err)
    }
}

pub type Result<T> = std::result::Result<T, CortexError>;
