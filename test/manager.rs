// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::MemoryStore;

use anyhow::Result;
use ghkeep::{
    manager::{Action, ErrorKind, FileInfo, LineMatch, SearchResult},
    store::EntryKind,
    FileManager,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn manager(store: MemoryStore) -> FileManager<MemoryStore> {
    FileManager::new(store, "proj")
}

fn entry(path: &str, kind: EntryKind) -> (String, EntryKind) {
    (path.into(), kind)
}

fn summarize(listing: &[FileInfo]) -> Vec<(String, EntryKind)> {
    listing
        .iter()
        .map(|info| (info.path.clone(), info.kind))
        .collect()
}

#[tokio::test]
async fn write_then_read_lands_under_namespace() -> Result<()> {
    let manager = manager(MemoryStore::new());
    let confirmation = manager
        .write_file("docs/notes.md", "hello\n", "add notes")
        .await?;

    assert_eq!(confirmation.action, Action::Created);
    assert_eq!(confirmation.path, "docs/notes.md");
    assert_eq!(manager.store().paths(), vec!["proj/docs/notes.md"]);
    assert_eq!(manager.read_file("docs/notes.md").await?, "hello\n");
    assert_eq!(manager.read_file("/docs/notes.md").await?, "hello\n");

    Ok(())
}

#[tokio::test]
async fn write_to_absent_path_behaves_like_create() -> Result<()> {
    let written = manager(MemoryStore::new());
    let created = manager(MemoryStore::new());

    written.write_file("a.md", "body", "write").await?;
    created.create_file("a.md", "body", "create").await?;

    assert_eq!(written.store().paths(), created.store().paths());
    assert_eq!(
        written.store().content("proj/a.md"),
        created.store().content("proj/a.md")
    );

    Ok(())
}

#[tokio::test]
async fn write_to_existing_file_updates_it() -> Result<()> {
    let manager = manager(MemoryStore::with_files([("proj/a.md", "old")]));
    let confirmation = manager.write_file("a.md", "new", "update").await?;

    assert_eq!(confirmation.action, Action::Updated);
    assert_eq!(
        confirmation.to_string(),
        format!(
            "File updated successfully: {}",
            confirmation.commit.html_url
        )
    );
    assert_eq!(manager.read_file("a.md").await?, "new");

    Ok(())
}

#[tokio::test]
async fn create_refuses_taken_path() -> Result<()> {
    let manager = manager(MemoryStore::with_files([
        ("proj/a.md", "old"),
        ("proj/docs/b.md", "old"),
    ]));

    let error = manager.create_file("a.md", "new", "create").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::AlreadyExists { ref path } if path == "a.md"));

    let error = manager.create_file("docs", "new", "create").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::AlreadyExists { .. }));
    assert_eq!(manager.read_file("a.md").await?, "old");

    Ok(())
}

#[tokio::test]
async fn read_reports_missing_and_directory_paths() -> Result<()> {
    let manager = manager(MemoryStore::with_files([("proj/docs/a.md", "a")]));

    let error = manager.read_file("nope.md").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::NotFound { ref path } if path == "nope.md"));
    assert_eq!(
        error.to_string(),
        r#"failed to read file: "nope.md" does not exist"#
    );

    let error = manager.read_file("docs").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::IsDirectory { .. }));

    Ok(())
}

#[tokio::test]
async fn read_rejects_binary_content() -> Result<()> {
    let store = MemoryStore::new();
    store.seed_bytes("proj/logo.png", &[0xff, 0xd8, 0xff]);
    let manager = manager(store);

    let error = manager.read_file("logo.png").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Decode { .. }));

    Ok(())
}

#[tokio::test]
async fn write_refuses_directory() -> Result<()> {
    let manager = manager(MemoryStore::with_files([("proj/docs/a.md", "a")]));

    let error = manager.write_file("docs", "x", "write").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::IsDirectory { .. }));

    Ok(())
}

#[tokio::test]
async fn stale_hash_fails_write_and_delete() -> Result<()> {
    let manager = manager(MemoryStore::with_files([("proj/a.md", "a")]));

    manager.store().go_stale();
    let error = manager.write_file("a.md", "b", "write").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::ConflictStale { ref path } if path == "a.md"));

    manager.store().go_stale();
    let error = manager.delete_file("a.md", "delete").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::ConflictStale { .. }));
    assert_eq!(manager.read_file("a.md").await?, "a");

    Ok(())
}

#[tokio::test]
async fn delete_removes_file() -> Result<()> {
    let manager = manager(MemoryStore::with_files([
        ("proj/a.md", "a"),
        ("proj/b.md", "b"),
    ]));

    let confirmation = manager.delete_file("a.md", "delete").await?;
    assert_eq!(confirmation.action, Action::Deleted);
    assert_eq!(manager.store().paths(), vec!["proj/b.md"]);

    let error = manager.delete_file("a.md", "delete").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::NotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn shallow_listing_holds_direct_children() -> Result<()> {
    let manager = manager(MemoryStore::with_files([
        ("proj/a.md", "a"),
        ("proj/docs/sub/y.md", "y"),
        ("proj/docs/x.md", "xx"),
        ("proj/z.md", "z"),
        ("other/ignored.md", "i"),
    ]));

    let listing = manager.list_files("", false).await?;
    assert_eq!(
        summarize(&listing),
        vec![
            entry("a.md", EntryKind::File),
            entry("docs", EntryKind::Directory),
            entry("z.md", EntryKind::File),
        ]
    );
    assert_eq!(listing[0].size, Some(1));
    assert_eq!(listing[1].size, None);

    Ok(())
}

#[tokio::test]
async fn recursive_listing_is_pre_order() -> Result<()> {
    let manager = manager(MemoryStore::with_files([
        ("proj/a.md", "a"),
        ("proj/docs/sub/y.md", "y"),
        ("proj/docs/x.md", "x"),
        ("proj/z.md", "z"),
    ]));

    let listing = manager.list_files("", true).await?;
    assert_eq!(
        summarize(&listing),
        vec![
            entry("a.md", EntryKind::File),
            entry("docs", EntryKind::Directory),
            entry("docs/sub", EntryKind::Directory),
            entry("docs/sub/y.md", EntryKind::File),
            entry("docs/x.md", EntryKind::File),
            entry("z.md", EntryKind::File),
        ]
    );

    let listing = manager.list_files("docs", true).await?;
    assert_eq!(
        summarize(&listing),
        vec![
            entry("docs/sub", EntryKind::Directory),
            entry("docs/sub/y.md", EntryKind::File),
            entry("docs/x.md", EntryKind::File),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn listing_file_is_not_a_directory() -> Result<()> {
    let manager = manager(MemoryStore::with_files([("proj/a.md", "a")]));

    let error = manager.list_files("a.md", false).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::NotADirectory { .. }));

    let error = manager.list_files("missing", true).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::NotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn search_stays_inside_namespace() -> Result<()> {
    let manager = manager(MemoryStore::with_files([
        (
            "proj/docs/api.md",
            indoc! {"
                # API
                Auth uses tokens.
                  See AUTH section.
            "},
        ),
        ("proj/readme.md", "nothing here"),
        ("other/auth.md", "auth everywhere"),
    ]));

    let results = manager.search_content("auth", None).await?;
    assert_eq!(
        results,
        vec![SearchResult {
            file: "docs/api.md".into(),
            matches: vec![
                LineMatch {
                    line: 2,
                    content: "Auth uses tokens.".into(),
                },
                LineMatch {
                    line: 3,
                    content: "See AUTH section.".into(),
                },
            ],
        }]
    );

    Ok(())
}

#[tokio::test]
async fn search_drops_unconfirmed_hits() -> Result<()> {
    let store = MemoryStore::with_files([
        ("proj/fresh.md", "token rotation"),
        ("proj/stale.md", "rewritten since indexing"),
        ("proj/docs/inner.md", "token"),
    ]);
    store.set_search_hits(&["proj/stale.md", "proj/gone.md", "proj/docs", "proj/fresh.md"]);
    let manager = manager(store);

    let results = manager.search_content("Token", None).await?;
    let files = results
        .iter()
        .map(|result| result.file.as_str())
        .collect::<Vec<_>>();
    assert_eq!(files, vec!["fresh.md"]);

    Ok(())
}

#[tokio::test]
async fn search_refuses_blank_query() {
    let manager = manager(MemoryStore::new());

    let error = manager.search_content("  ", None).await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::InvalidQuery));
}

#[tokio::test]
async fn update_config_sets_nested_string_value() -> Result<()> {
    let config = indoc! {r#"
        {
          "project": {
            "name": "demo"
          },
          "status": "active"
        }
    "#};
    let manager = manager(MemoryStore::with_files([("proj/config.json", config)]));

    let update = manager.update_config("project.version", "2").await?;
    assert_eq!(update.to_string(), "Configuration updated: project.version = 2");

    let update = manager.update_config("status.phase", "beta").await?;
    assert_eq!(update.key, "status.phase");

    let config = manager.get_project_info().await?;
    assert_eq!(
        Value::Object(config),
        json!({
            "project": { "name": "demo", "version": "2" },
            "status": { "phase": "beta" },
        })
    );

    Ok(())
}

#[tokio::test]
async fn update_config_refuses_empty_segment() {
    let manager = manager(MemoryStore::with_files([("proj/config.json", "{}")]));

    for key in ["", "a..b", ".a", "a."] {
        let error = manager.update_config(key, "x").await.unwrap_err();
        assert!(matches!(error.kind, ErrorKind::InvalidKey(_)), "{key:?}");
    }
}

#[tokio::test]
async fn project_info_needs_json_object() -> Result<()> {
    let manager = manager(MemoryStore::new());
    let error = manager.get_project_info().await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::NotFound { ref path } if path == "config.json"));

    manager.store().seed("proj/config.json", "[1, 2]");
    let error = manager.get_project_info().await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Decode { .. }));

    manager.store().seed("proj/config.json", "not json");
    let error = manager.update_config("a", "b").await.unwrap_err();
    assert!(matches!(error.kind, ErrorKind::Decode { .. }));

    Ok(())
}

#[tokio::test]
async fn empty_namespace_uses_repository_root() -> Result<()> {
    let manager = FileManager::new(MemoryStore::new(), "");
    manager.write_file("a.md", "a", "write").await?;

    assert_eq!(manager.store().paths(), vec!["a.md"]);
    let listing = manager.list_files("", false).await?;
    assert_eq!(summarize(&listing), vec![entry("a.md", EntryKind::File)]);

    Ok(())
}
