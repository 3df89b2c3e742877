// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Documentation structure generation.
//!
//! Turns a [`ProjectInfo`] into a starter set of documentation files, then
//! writes that set through a [`FileManager`]. Rendering is pure, the date is
//! handed in by the caller. Writing is best-effort: every file is attempted,
//! and failures are collected into the returned [`Manifest`] instead of
//! cutting the run short.

use crate::{
    detect::{detect_project, Detection, ProjectInfo},
    manager::{Confirmation, ErrorKind, FileManager, CONFIG_FILE},
    store::RemoteStore,
};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

const PLACEHOLDER: &str = "TBD";
const NOT_APPLICABLE: &str = "N/A";

/// Render documentation files for a project.
///
/// Every project gets the base set. Frontend, backend, monorepo, and mobile
/// projects get extra guides on top.
pub fn documentation_files(info: &ProjectInfo, date: NaiveDate) -> Vec<GeneratedFile> {
    let date = date.format("%Y-%m-%d").to_string();
    let mut files = vec![
        config_json(info, &date),
        readme(info, &date),
        setup_guide(info, &date),
        architecture(info),
        deployment_guide(info),
        team_members(info, &date),
        initial_adr(info, &date),
    ];

    if info.project_type.is_frontend() {
        files.extend(frontend_docs(info));
    }

    if info.project_type.is_backend() {
        files.extend(backend_docs(info));
    }

    if info.structure.is_monorepo {
        files.push(monorepo_doc(info));
    }

    if info.project_type.is_mobile() {
        files.push(mobile_doc(info));
    }

    files
}

/// Write documentation structure through file manager.
///
/// Each file is created first. Files that already exist get overwritten
/// instead. Any other failure is recorded and the next file is attempted.
#[instrument(skip(manager, info), level = "debug")]
pub async fn generate_structure<S>(manager: &FileManager<S>, info: &ProjectInfo, date: NaiveDate) -> Manifest
where
    S: RemoteStore,
{
    let mut manifest = Manifest::default();
    for file in documentation_files(info, date) {
        match write_one(manager, &file).await {
            Ok(confirmation) => manifest.created.push(confirmation),
            Err(error) => {
                warn!("cannot write {:?}: {error}", file.path);
                manifest.failures.push(ItemFailure {
                    path: file.path,
                    reason: error.to_string(),
                });
            }
        }
    }
    info!(
        "generated {} files with {} failures",
        manifest.created.len(),
        manifest.failures.len()
    );

    manifest
}

/// Detect project held by the manager's repository, then write its
/// documentation into the active namespace.
///
/// Detection always looks at the repository root, whatever the namespace.
pub async fn initialize<S>(manager: &FileManager<S>, name: &str, date: NaiveDate) -> Initialization
where
    S: RemoteStore,
{
    let detection = detect_project(manager.store(), name).await;
    let manifest = generate_structure(manager, &detection.info, date).await;

    Initialization {
        detection,
        manifest,
    }
}

async fn write_one<S>(manager: &FileManager<S>, file: &GeneratedFile) -> crate::manager::Result<Confirmation>
where
    S: RemoteStore,
{
    let message = format!("docs: initialize {}", file.path);
    match manager.create_file(&file.path, &file.content, &message).await {
        Err(error) if matches!(error.kind, ErrorKind::AlreadyExists { .. }) => {
            let message = format!("docs: update {}", file.path);
            manager.write_file(&file.path, &file.content, &message).await
        }
        result => result,
    }
}

/// Rendered documentation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Logical path.
    pub path: String,

    /// Full file content.
    pub content: String,
}

impl GeneratedFile {
    fn new(path: &str, content: String) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }
}

/// Outcome of structure generation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Manifest {
    /// Files written, in generation order.
    pub created: Vec<Confirmation>,

    /// Files that could not be written.
    pub failures: Vec<ItemFailure>,
}

/// Outcome of detection followed by generation.
#[derive(Debug, Clone, Serialize)]
pub struct Initialization {
    pub detection: Detection,
    pub manifest: Manifest,
}

/// File that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub path: String,
    pub reason: String,
}

// Line-oriented text builder. Skipped lines leave no trace.
#[derive(Default)]
struct Document {
    text: String,
}

impl Document {
    fn line(mut self, line: impl AsRef<str>) -> Self {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
        self
    }

    fn line_if(self, condition: bool, line: impl AsRef<str>) -> Self {
        if condition {
            self.line(line)
        } else {
            self
        }
    }

    fn lines<I>(self, lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        lines.into_iter().fold(self, Self::line)
    }

    fn blank(self) -> Self {
        self.line("")
    }

    fn finish(self) -> String {
        self.text
    }
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_APPLICABLE)
}

fn is_node(info: &ProjectInfo) -> bool {
    matches!(info.language.as_deref(), Some("TypeScript" | "JavaScript"))
}

fn is_python(info: &ProjectInfo) -> bool {
    info.language.as_deref() == Some("Python")
}

fn package_manager(info: &ProjectInfo) -> &str {
    info.package_manager.as_deref().unwrap_or("npm")
}

fn config_json(info: &ProjectInfo, date: &str) -> GeneratedFile {
    let config = json!({
        "project": {
            "name": info.name,
            "type": info.project_type,
            "version": info.version.as_deref().unwrap_or("1.0.0"),
            "description": info.description.as_deref().unwrap_or("Project description"),
        },
        "tech_stack": {
            "framework": or_na(&info.framework),
            "language": or_na(&info.language),
            "technologies": info.technologies,
            "package_manager": or_na(&info.package_manager),
        },
        "structure": info.structure,
        "team": {
            "lead": PLACEHOLDER,
            "size": PLACEHOLDER,
            "contact": PLACEHOLDER,
        },
        "important_links": {
            "repository": PLACEHOLDER,
            "documentation": PLACEHOLDER,
            "deployment": PLACEHOLDER,
        },
        "status": "active",
        "initialized_at": date,
        "initialized_by": "ghkeep",
    });

    GeneratedFile::new(CONFIG_FILE, format!("{config:#}\n"))
}

fn readme(info: &ProjectInfo, date: &str) -> GeneratedFile {
    let structure = &info.structure;
    let content = Document::default()
        .line(format!("# {}", info.name))
        .blank()
        .line(info.description.as_deref().unwrap_or("Project description."))
        .blank()
        .line("## Overview")
        .blank()
        .line(format!(
            "This is a **{}** project built with the following technologies:",
            info.project_type
        ))
        .blank()
        .lines(info.technologies.iter().map(|tech| format!("- {tech}")))
        .blank()
        .line("## Tech Stack")
        .blank()
        .line(format!("- **Framework**: {}", or_na(&info.framework)))
        .line(format!("- **Language**: {}", or_na(&info.language)))
        .line(format!("- **Package manager**: {}", or_na(&info.package_manager)))
        .blank()
        .line("## Project Structure")
        .blank()
        .line_if(structure.is_monorepo, "This is a monorepo holding multiple packages.")
        .line_if(structure.has_components, "- Reusable components in `src/components`")
        .line_if(structure.has_pages, "- Pages and routes in `src/pages` or `app/`")
        .line_if(structure.has_api, "- API routes in `src/api` or `src/routes`")
        .line_if(structure.has_models, "- Data models in `src/models`")
        .blank()
        .line("## Documentation")
        .blank()
        .line("- [Setup guide](docs/SETUP.md)")
        .line("- [Architecture](docs/ARCHITECTURE.md)")
        .line("- [Deployment](docs/DEPLOYMENT.md)")
        .line_if(info.project_type.is_frontend(), "- [Components](docs/COMPONENTS.md)")
        .line_if(info.project_type.is_backend(), "- [API](docs/API.md)")
        .blank()
        .line("## Team")
        .blank()
        .line("See [team/members.json](team/members.json) for team information.")
        .blank()
        .line("## Status")
        .blank()
        .line("**Status**: Active")
        .line(format!("**Last updated**: {date}"))
        .finish();

    GeneratedFile::new("README.md", content)
}

fn setup_guide(info: &ProjectInfo, date: &str) -> GeneratedFile {
    let install = format!("{} install", package_manager(info));
    let content = Document::default()
        .line(format!("# Setup Guide: {}", info.name))
        .blank()
        .line("## Prerequisites")
        .blank()
        .line_if(is_node(info), "- Node.js 18 or newer")
        .line_if(is_node(info), format!("- {}", package_manager(info)))
        .line_if(is_python(info), "- Python 3.8 or newer")
        .line_if(is_python(info), "- pip")
        .blank()
        .line("## Installation")
        .blank()
        .line("### 1. Clone the repository")
        .blank()
        .line("```bash")
        .line("git clone <REPOSITORY_URL>")
        .line(format!("cd {}", info.name))
        .line("```")
        .blank()
        .line("### 2. Install dependencies")
        .blank()
        .lines(
            is_node(info)
                .then(|| ["```bash".to_string(), install.clone(), "```".to_string()])
                .into_iter()
                .flatten(),
        )
        .lines(
            is_python(info)
                .then_some([
                    "```bash",
                    "python -m venv venv",
                    "source venv/bin/activate",
                    "pip install -r requirements.txt",
                    "```",
                ])
                .into_iter()
                .flatten(),
        )
        .blank()
        .line("### 3. Configure the environment")
        .blank()
        .line("```bash")
        .line("cp .env.example .env")
        .line("```")
        .blank()
        .line("### 4. Run the project")
        .blank()
        .line_if(info.project_type.is_frontend(), format!("`{} run dev`", package_manager(info)))
        .line_if(info.project_type.is_backend(), format!("`{} run start`", package_manager(info)))
        .blank()
        .line("## Troubleshooting")
        .blank()
        .line(format!("- Dependency errors: remove `node_modules` and rerun `{install}`"))
        .line("- Port already in use: change the port in `.env`")
        .blank()
        .line(format!("_Last updated: {date}_"))
        .finish();

    GeneratedFile::new("docs/SETUP.md", content)
}

fn architecture(info: &ProjectInfo) -> GeneratedFile {
    let structure = &info.structure;
    let content = Document::default()
        .line(format!("# Architecture: {}", info.name))
        .blank()
        .line("## Overview")
        .blank()
        .line(format!(
            "**{}** is a **{}** project.",
            info.name, info.project_type
        ))
        .blank()
        .line("## Tech Stack")
        .blank()
        .line(format!("- **Framework**: {}", or_na(&info.framework)))
        .line(format!("- **Language**: {}", or_na(&info.language)))
        .line(format!("- **Technologies**: {}", info.technologies.join(", ")))
        .blank()
        .line("## Directory Layout")
        .blank()
        .line("```")
        .line(format!("{}/", info.name))
        .line("├── src/")
        .line_if(structure.has_components, "│   ├── components/")
        .line_if(structure.has_pages, "│   ├── pages/")
        .line_if(structure.has_api, "│   ├── api/")
        .line_if(structure.has_models, "│   ├── models/")
        .line("├── docs/")
        .line("└── README.md")
        .line("```")
        .blank()
        .line("## Design Decisions")
        .blank()
        .line("Recorded as ADRs under `decisions/adr/`.")
        .finish();

    GeneratedFile::new("docs/ARCHITECTURE.md", content)
}

fn deployment_guide(info: &ProjectInfo) -> GeneratedFile {
    let content = Document::default()
        .line(format!("# Deployment: {}", info.name))
        .blank()
        .line("## Environments")
        .blank()
        .line(format!("- **Development**: {PLACEHOLDER}"))
        .line(format!("- **Staging**: {PLACEHOLDER}"))
        .line(format!("- **Production**: {PLACEHOLDER}"))
        .blank()
        .line("## Build")
        .blank()
        .line_if(is_node(info), format!("`{} run build`", package_manager(info)))
        .line_if(is_python(info), "Package the application with its pinned requirements.")
        .blank()
        .line("## Release Checklist")
        .blank()
        .line("- [ ] Tests pass")
        .line("- [ ] Environment variables configured")
        .line("- [ ] Database migrations applied")
        .line("- [ ] Monitoring in place")
        .finish();

    GeneratedFile::new("docs/DEPLOYMENT.md", content)
}

fn team_members(info: &ProjectInfo, date: &str) -> GeneratedFile {
    let members = json!({
        "team_name": format!("{} Team", info.name),
        "members": [
            {
                "name": PLACEHOLDER,
                "role": "Tech Lead",
                "email": "lead@example.com",
                "github": "username",
                "timezone": "UTC",
            }
        ],
        "updated_at": date,
    });

    GeneratedFile::new("team/members.json", format!("{members:#}\n"))
}

fn initial_adr(info: &ProjectInfo, date: &str) -> GeneratedFile {
    let content = Document::default()
        .line("# ADR 001: Initial Project Setup")
        .blank()
        .line(format!("**Date**: {date}"))
        .line("**Status**: Accepted")
        .blank()
        .line("## Context")
        .blank()
        .line(format!(
            "The project **{}** needs a documented baseline for its technical decisions.",
            info.name
        ))
        .blank()
        .line("## Decision")
        .blank()
        .line(format!("- **Type**: {}", info.project_type))
        .line(format!("- **Framework**: {}", or_na(&info.framework)))
        .line(format!("- **Language**: {}", or_na(&info.language)))
        .lines(info.technologies.iter().map(|tech| format!("- {tech}")))
        .blank()
        .line("## Consequences")
        .blank()
        .line("Later decisions are recorded as new ADRs next to this one.")
        .finish();

    GeneratedFile::new("decisions/adr/001-initial-setup.md", content)
}

fn frontend_docs(info: &ProjectInfo) -> [GeneratedFile; 2] {
    let components = Document::default()
        .line(format!("# Components: {}", info.name))
        .blank()
        .line("## Catalog")
        .blank()
        .line("| Component | Location | Description |")
        .line("|-----------|----------|-------------|")
        .line(format!("| {PLACEHOLDER} | {PLACEHOLDER} | {PLACEHOLDER} |"))
        .blank()
        .line("## Conventions")
        .blank()
        .line("- One component per file")
        .line("- Props are typed")
        .line("- Shared components live in `src/components`")
        .finish();

    let practices = Document::default()
        .line("# Frontend Best Practices")
        .blank()
        .line(format!("Guidelines for {} code.", or_na(&info.framework)))
        .blank()
        .line("- Keep components small and focused")
        .line("- Lift state only as far as needed")
        .line("- Prefer composition over configuration")
        .line("- Test user-facing behavior, not implementation")
        .finish();

    [
        GeneratedFile::new("docs/COMPONENTS.md", components),
        GeneratedFile::new("guides/best-practices.md", practices),
    ]
}

fn backend_docs(info: &ProjectInfo) -> [GeneratedFile; 2] {
    let api = Document::default()
        .line(format!("# API: {}", info.name))
        .blank()
        .line("## Endpoints")
        .blank()
        .line("| Method | Path | Description |")
        .line("|--------|------|-------------|")
        .line(format!("| GET | /health | {PLACEHOLDER} |"))
        .blank()
        .line("## Authentication")
        .blank()
        .line(PLACEHOLDER)
        .finish();

    let errors = Document::default()
        .line("# Error Handling")
        .blank()
        .line(format!("Conventions for {} services.", or_na(&info.framework)))
        .blank()
        .line("- Return structured error bodies with a stable code")
        .line("- Log unexpected failures with request context")
        .line("- Never leak internal details to clients")
        .finish();

    [
        GeneratedFile::new("docs/API.md", api),
        GeneratedFile::new("guides/error-handling.md", errors),
    ]
}

fn monorepo_doc(info: &ProjectInfo) -> GeneratedFile {
    let content = Document::default()
        .line(format!("# Monorepo: {}", info.name))
        .blank()
        .line("## Packages")
        .blank()
        .line("| Package | Path | Owner |")
        .line("|---------|------|-------|")
        .line(format!("| {PLACEHOLDER} | {PLACEHOLDER} | {PLACEHOLDER} |"))
        .blank()
        .line("## Workflow")
        .blank()
        .line(format!(
            "Run workspace tasks from the repository root with `{}`.",
            package_manager(info)
        ))
        .finish();

    GeneratedFile::new("docs/MONOREPO.md", content)
}

fn mobile_doc(info: &ProjectInfo) -> GeneratedFile {
    let content = Document::default()
        .line(format!("# Mobile: {}", info.name))
        .blank()
        .line(format!("Built with {}.", or_na(&info.framework)))
        .blank()
        .line("## Platforms")
        .blank()
        .line("- iOS")
        .line("- Android")
        .blank()
        .line("## Builds")
        .blank()
        .line(format!("- **Store accounts**: {PLACEHOLDER}"))
        .line(format!("- **Signing**: {PLACEHOLDER}"))
        .finish();

    GeneratedFile::new("docs/MOBILE.md", content)
}
