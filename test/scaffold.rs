// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::MemoryStore;

use anyhow::Result;
use chrono::NaiveDate;
use ghkeep::{
    detect::{detect_project, ProjectInfo, ProjectType},
    manager::Action,
    scaffold::{documentation_files, generate_structure, initialize},
    FileManager,
};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn react_app() -> MemoryStore {
    MemoryStore::with_files([
        (
            "package.json",
            indoc! {r#"
                {
                  "name": "storefront",
                  "version": "0.3.0",
                  "dependencies": { "react": "^18.0.0" },
                  "devDependencies": { "typescript": "^5.0.0", "vite": "^5.0.0" }
                }
            "#},
        ),
        ("pnpm-lock.yaml", ""),
        ("src/components/Button.tsx", "export {}"),
        ("src/pages/Home.tsx", "export {}"),
        ("src/main.tsx", "export {}"),
    ])
}

#[tokio::test]
async fn detect_react_project_from_store() {
    let detection = detect_project(&react_app(), "fallback").await;
    let info = detection.info;

    assert!(detection.failures.is_empty());
    assert_eq!(info.project_type, ProjectType::FrontendReact);
    assert_eq!(info.name, "storefront");
    assert_eq!(info.version.as_deref(), Some("0.3.0"));
    assert_eq!(info.technologies, vec!["React", "TypeScript", "Vite"]);
    assert_eq!(info.framework.as_deref(), Some("React"));
    assert_eq!(info.language.as_deref(), Some("TypeScript"));
    assert_eq!(info.package_manager.as_deref(), Some("pnpm"));
    assert!(info.structure.has_components);
    assert!(info.structure.has_pages);
    assert!(!info.structure.has_api);
}

#[tokio::test]
async fn detect_empty_repository_as_unknown() {
    let detection = detect_project(&MemoryStore::new(), "blank").await;

    assert!(detection.failures.is_empty());
    assert_eq!(detection.info, ProjectInfo::unknown("blank"));
}

#[tokio::test]
async fn detect_records_broken_probe_and_keeps_going() {
    let store = MemoryStore::with_files([
        ("package.json", "{}"),
        ("requirements.txt", "flask==3.0\n"),
    ]);
    store.break_path("package.json");

    let detection = detect_project(&store, "api").await;
    let paths = detection
        .failures
        .iter()
        .map(|failure| failure.path.as_str())
        .collect::<Vec<_>>();

    assert_eq!(paths, vec!["package.json"]);
    assert_eq!(detection.info.project_type, ProjectType::BackendPython);
    assert_eq!(detection.info.framework.as_deref(), Some("Flask"));
}

#[tokio::test]
async fn generate_structure_writes_every_file() -> Result<()> {
    let manager = FileManager::new(MemoryStore::new(), "shop");
    let info = detect_project(&react_app(), "storefront").await.info;

    let manifest = generate_structure(&manager, &info, date()).await;
    let expected = documentation_files(&info, date())
        .into_iter()
        .map(|file| file.path)
        .collect::<Vec<_>>();
    let created = manifest
        .created
        .iter()
        .map(|confirmation| confirmation.path.clone())
        .collect::<Vec<_>>();

    assert!(manifest.failures.is_empty());
    assert_eq!(created, expected);
    assert!(created.contains(&"docs/COMPONENTS.md".to_string()));
    assert!(manifest
        .created
        .iter()
        .all(|confirmation| confirmation.action == Action::Created));

    let config = manager.get_project_info().await?;
    assert_eq!(config["initialized_at"], "2025-03-14");

    Ok(())
}

#[tokio::test]
async fn generate_structure_overwrites_existing_files() -> Result<()> {
    let manager = FileManager::new(
        MemoryStore::with_files([("shop/README.md", "hand written")]),
        "shop",
    );
    let info = ProjectInfo::unknown("shop");

    let manifest = generate_structure(&manager, &info, date()).await;
    let readme = manifest
        .created
        .iter()
        .find(|confirmation| confirmation.path == "README.md")
        .map(|confirmation| confirmation.action);

    assert!(manifest.failures.is_empty());
    assert_eq!(readme, Some(Action::Updated));
    assert_ne!(manager.read_file("README.md").await?, "hand written");

    let rerun = generate_structure(&manager, &info, date()).await;
    assert!(rerun
        .created
        .iter()
        .all(|confirmation| confirmation.action == Action::Updated));

    Ok(())
}

#[tokio::test]
async fn generate_structure_records_failures_and_continues() {
    let store = MemoryStore::new();
    store.break_path("shop/docs/SETUP.md");
    let manager = FileManager::new(store, "shop");
    let info = ProjectInfo::unknown("shop");

    let manifest = generate_structure(&manager, &info, date()).await;
    let failed = manifest
        .failures
        .iter()
        .map(|failure| failure.path.as_str())
        .collect::<Vec<_>>();

    assert_eq!(failed, vec!["docs/SETUP.md"]);
    assert_eq!(
        manifest.created.len(),
        documentation_files(&info, date()).len() - 1
    );
    assert!(manager.store().content("shop/docs/DEPLOYMENT.md").is_some());
}

#[tokio::test]
async fn initialize_detects_repository_root_and_writes_namespace() {
    let store = react_app();
    let before = store.paths();
    let manager = FileManager::new(store, "storefront");

    let outcome = initialize(&manager, "storefront", date()).await;

    assert_eq!(
        outcome.detection.info.project_type,
        ProjectType::FrontendReact
    );
    assert!(outcome.detection.failures.is_empty());
    assert!(outcome.manifest.failures.is_empty());

    let written = manager
        .store()
        .paths()
        .into_iter()
        .filter(|path| !before.contains(path))
        .collect::<Vec<_>>();
    assert_eq!(written.len(), outcome.manifest.created.len());
    assert!(written.iter().all(|path| path.starts_with("storefront/")));
}
