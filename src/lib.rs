//! # Cortex Architecture
//!
//! Cortex is a **hierarchical, filesystem-backed memory store** for AI
//! coding agents. This crate is the engine: it is a library first, and any
//! CLI or MCP server is a client of it.
//!
//! Memories are markdown files with YAML frontmatter, addressed by slug
//! paths like `project/cortex/architecture`, grouped into named stores.
//! Each store keeps a derived index (SQLite by default, per-category YAML
//! for legacy stores) for fast listing and querying.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Facade (api.rs)                                        │
//! │  - Resolves stores, parses string paths, stamps the clock   │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Business rules: mode policy, protected categories,       │
//! │    write-then-index discipline                              │
//! │  - No I/O assumptions, no printing, no ambient clock        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Narrow ports: MemoryStore, IndexStore, CategoryStore,    │
//! │    StoreRegistry, ConfigStore                               │
//! │  - fs + sqlite (preferred) + yaml (legacy) + mem (tests)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Files Are Truth
//!
//! The memory files on disk are the authoritative state; every index is a
//! rebuildable projection. The engine writes the file first and updates
//! the index second, and all file writes are atomic (sibling temp + fsync
//! + rename). The consequence is a simple recovery story: whatever goes
//! wrong between those two steps — a crash, a kill, a concurrent writer on
//! the legacy YAML layout — `reindex` walks the filesystem and restores a
//! faithful index. Forgetting an index update is a latency bug, never a
//! correctness bug.
//!
//! ## Identity
//!
//! Every identifier flows through the types in [`path`]: a [`path::Slug`]
//! per segment, a [`path::CategoryPath`] for interior nodes, and a
//! [`path::MemoryPath`] for leaves. Uppercase, `..`, separators and
//! friends are rejected at the boundary, so nothing downstream ever
//! sanitizes a path.
//!
//! ## Module Overview
//!
//! - [`api`]: the embedding facade — entry point for all operations
//! - [`commands`]: one module per domain operation
//! - [`store`]: port traits and their implementations
//! - [`model`]: core records (`Memory`, index projections, modes)
//! - [`path`]: slug-path identity types
//! - [`frontmatter`]: memory-file codec
//! - [`config`]: config file, settings, store registry
//! - [`resolver`]: explicit / local / default store resolution
//! - [`error`]: the error taxonomy

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod model;
pub mod path;
pub mod resolver;
pub mod store;

pub use api::CortexApi;
pub use error::{CortexError, ErrorCode, Result};
