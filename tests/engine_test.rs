//! End-to-end scenarios against real temp-dir stores.

use chrono::{DateTime, TimeZone, Utc};
use cortex::commands::{self, category, create, list, move_memory, prune, recent};
use cortex::config::{IndexLayout, StoreDefinition};
use cortex::error::ErrorCode;
use cortex::model::{CategoryMode, MemoryDraft};
use cortex::path::{CategoryPath, MemoryPath};
use cortex::store::{QueryFilter, ScopedAdapter, SortBy, SortOrder};
use tempfile::TempDir;

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn open(dir: &TempDir, layout: IndexLayout) -> ScopedAdapter {
    let mut definition = StoreDefinition::new(dir.path());
    definition.index_layout = layout;
    ScopedAdapter::open(dir.path().to_path_buf(), &definition, "test")
}

fn draft(content: &str, tags: &[&str]) -> MemoryDraft {
    MemoryDraft {
        content: content.into(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
        source: "user".into(),
        ..Default::default()
    }
}

fn cp(s: &str) -> CategoryPath {
    CategoryPath::parse(s).unwrap()
}

fn mp(s: &str) -> MemoryPath {
    MemoryPath::parse(s).unwrap()
}

#[test]
fn create_then_show_on_disk() {
    let dir = TempDir::new().unwrap();
    let adapter = open(&dir, IndexLayout::Sqlite);
    category::create(&adapter, &cp("project")).unwrap();

    let created = create::run(
        &adapter,
        &mp("project/notes"),
        draft("hello", &["a", "a", "b"]),
        t(100),
    )
    .unwrap();

    assert_eq!(created.metadata.tags, vec!["a", "b"]);
    assert_eq!(created.metadata.created_at, created.metadata.updated_at);
    assert!(dir.path().join("project/notes.md").is_file());

    let listing = list::run(
        &adapter,
        &cp("project"),
        list::ListOptions {
            include_expired: false,
            now: t(200),
        },
    )
    .unwrap();
    assert_eq!(listing.memories.len(), 1);
    assert_eq!(listing.memories[0].path, mp("project/notes"));
}

#[test]
fn expire_then_prune() {
    for layout in [IndexLayout::Sqlite, IndexLayout::Yaml] {
        let dir = TempDir::new().unwrap();
        let adapter = open(&dir, layout);
        category::create(&adapter, &cp("history")).unwrap();

        let mut old = draft("old", &[]);
        old.expires_at = Some(t(978_307_200)); // 2001-01-01
        create::run(&adapter, &mp("history/old"), old, t(900_000_000)).unwrap();
        create::run(&adapter, &mp("history/new"), draft("new", &[]), t(900_000_001)).unwrap();

        let now = t(1_893_456_000); // 2030-01-01
        let dry = prune::run(&adapter, prune::PruneOptions { dry_run: true, now }).unwrap();
        assert_eq!(dry.pruned, vec![mp("history/old")]);
        assert!(dir.path().join("history/old.md").is_file());
        assert!(dir.path().join("history/new.md").is_file());

        let real = prune::run(&adapter, prune::PruneOptions { dry_run: false, now }).unwrap();
        assert_eq!(real.pruned, vec![mp("history/old")]);
        assert!(!dir.path().join("history/old.md").exists());
        assert!(dir.path().join("history/new.md").is_file());

        // `history` still anchors the surviving memory after the reindex.
        let root = adapter.index().load(&CategoryPath::root()).unwrap();
        let names: Vec<String> = root
            .subcategories
            .iter()
            .map(|s| s.path.to_string())
            .collect();
        assert_eq!(names, vec!["history"], "layout {layout:?}");
    }
}

#[test]
fn reindex_cleans_stale_subcategory() {
    for layout in [IndexLayout::Sqlite, IndexLayout::Yaml] {
        let dir = TempDir::new().unwrap();
        let adapter = open(&dir, layout);
        for (category, path) in [("alpha", "alpha/a"), ("beta", "beta/b")] {
            category::create(&adapter, &cp(category)).unwrap();
            create::run(&adapter, &mp(path), draft("x", &[]), t(1)).unwrap();
        }

        // Remove beta's memory behind the engine's back.
        std::fs::remove_file(dir.path().join("beta/b.md")).unwrap();
        adapter.index().reindex(&CategoryPath::root()).unwrap();

        let root = adapter.index().load(&CategoryPath::root()).unwrap();
        let names: Vec<String> = root
            .subcategories
            .iter()
            .map(|s| s.path.to_string())
            .collect();
        assert_eq!(names, vec!["alpha"], "layout {layout:?}");
    }
}

#[test]
fn move_retains_created_at() {
    let dir = TempDir::new().unwrap();
    let adapter = open(&dir, IndexLayout::Sqlite);
    category::create(&adapter, &cp("work")).unwrap();
    create::run(&adapter, &mp("work/task"), draft("the task", &[]), t(100)).unwrap();

    category::create(&adapter, &cp("work/done")).unwrap();
    let moved = move_memory::run(&adapter, &mp("work/task"), &mp("work/done/task"), t(200)).unwrap();

    assert_eq!(moved.metadata.created_at, t(100));
    assert_eq!(moved.metadata.updated_at, t(200));
    let err = adapter.memories().load(&mp("work/task")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryNotFound);
    assert_eq!(
        adapter.memories().load(&mp("work/done/task")).unwrap().content,
        "the task"
    );
}

#[test]
fn strict_mode_blocks_create() {
    let dir = TempDir::new().unwrap();
    let mut definition = StoreDefinition::new(dir.path());
    definition.category_mode = CategoryMode::Strict;
    definition.categories = vec![
        cortex::config::CategoryDecl {
            path: cp("standards"),
            description: None,
            subcategories: vec![],
        },
        cortex::config::CategoryDecl {
            path: cp("decisions"),
            description: None,
            subcategories: vec![],
        },
    ];
    commands::stores::init(&definition, "strict").unwrap();
    let adapter = ScopedAdapter::open(dir.path().to_path_buf(), &definition, "strict");

    let err = category::create(&adapter, &cp("standards/new")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::CategoryModeForbidsCreate);

    let err = create::run(&adapter, &mp("standards/new/m"), draft("x", &[]), t(1)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::CategoryNotFound);

    // Declared categories themselves still accept memories.
    create::run(&adapter, &mp("standards/style"), draft("x", &[]), t(1)).unwrap();
}

#[test]
fn query_by_tag_and_recency() {
    let dir = TempDir::new().unwrap();
    let adapter = open(&dir, IndexLayout::Sqlite);
    category::create(&adapter, &cp("m")).unwrap();
    create::run(&adapter, &mp("m/one"), draft("1", &["a"]), t(10)).unwrap();
    create::run(&adapter, &mp("m/two"), draft("2", &["a", "b"]), t(20)).unwrap();
    create::run(&adapter, &mp("m/three"), draft("3", &["c"]), t(30)).unwrap();

    let mut filter = QueryFilter::at(t(100));
    filter.tags = vec!["a".into()];
    filter.sort_by = SortBy::UpdatedAt;
    filter.sort_order = SortOrder::Desc;
    let hits = adapter.index().query(&filter).unwrap();
    let paths: Vec<String> = hits.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(paths, vec!["m/two", "m/one"]);
}

#[test]
fn recent_loads_content_newest_first() {
    let dir = TempDir::new().unwrap();
    let adapter = open(&dir, IndexLayout::Sqlite);
    category::create(&adapter, &cp("a")).unwrap();
    create::run(&adapter, &mp("a/first"), draft("oldest", &[]), t(10)).unwrap();
    create::run(&adapter, &mp("a/second"), draft("newest", &[]), t(20)).unwrap();

    let hits = recent::run(&adapter, recent::RecentOptions::at(t(100))).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].path, mp("a/second"));
    assert_eq!(hits[0].memory.content, "newest");
}

#[test]
fn crash_between_write_and_index_is_repaired_by_reindex() {
    let dir = TempDir::new().unwrap();
    let adapter = open(&dir, IndexLayout::Sqlite);
    category::create(&adapter, &cp("a")).unwrap();

    // Simulate a crash after the file write but before the index update:
    // write the memory file through the port and skip the index call.
    let memory = cortex::model::Memory::new(draft("orphan", &["lost"]), t(10)).unwrap();
    adapter.memories().add(&mp("a/orphan"), &memory).unwrap();

    let before = adapter.index().load(&cp("a")).unwrap();
    assert!(before.memories.is_empty());

    adapter.index().reindex(&CategoryPath::root()).unwrap();
    let after = adapter.index().load(&cp("a")).unwrap();
    assert_eq!(after.memories.len(), 1);
    assert_eq!(after.memories[0].tags, vec!["lost"]);
}

#[test]
fn reindex_recovers_uppercase_files_with_warning() {
    let dir = TempDir::new().unwrap();
    let adapter = open(&dir, IndexLayout::Sqlite);
    let memory = cortex::model::Memory::new(draft("misnamed", &[]), t(10)).unwrap();
    std::fs::create_dir_all(dir.path().join("Project")).unwrap();
    std::fs::write(
        dir.path().join("Project/Notes.md"),
        cortex::frontmatter::serialize(&memory).unwrap(),
    )
    .unwrap();

    let report = adapter.index().reindex(&CategoryPath::root()).unwrap();
    assert!(!report.warnings.is_empty());
    let hits = adapter
        .index()
        .query(&QueryFilter::at(t(100)))
        .unwrap();
    assert_eq!(hits[0].path, mp("project/notes"));
}

#[test]
fn empty_root_listing_is_empty() {
    let dir = TempDir::new().unwrap();
    let adapter = open(&dir, IndexLayout::Sqlite);
    let listing = list::run(
        &adapter,
        &CategoryPath::root(),
        list::ListOptions {
            include_expired: false,
            now: t(0),
        },
    )
    .unwrap();
    assert!(listing.memories.is_empty());
    assert!(listing.subcategories.is_empty());
}
