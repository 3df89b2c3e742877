// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Heuristic project classification.
//!
//! Detection looks at a repository's root through a [`RemoteStore`], reads
//! the few manifests it recognizes, and boils them down into a
//! [`ProjectInfo`]. Gathering and classification are split apart. Gathering
//! talks to the store and collects [`Evidence`], classification is a pure
//! function over that evidence.
//!
//! Detection never fails as a whole. Any probe that breaks is logged, and
//! recorded in [`Detection::failures`] next to whatever could still be
//! classified.

use crate::store::{EntryKind, RemoteContent, RemoteEntry, RemoteStore, StoreError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, instrument, warn};

const PACKAGE_MANIFEST: &str = "package.json";
const TSCONFIG: &str = "tsconfig.json";
const REQUIREMENTS: &str = "requirements.txt";
const PYTHON_MANIFESTS: [&str; 3] = [REQUIREMENTS, "pyproject.toml", "setup.py"];
const WORKSPACE_MANIFESTS: [&str; 3] = ["pnpm-workspace.yaml", "lerna.json", "turbo.json"];
const LOCK_FILES: [(&str, &str); 3] = [
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("package-lock.json", "npm"),
];

/// Detect what kind of project a repository holds.
///
/// Probes are made against the repository root. The `name` is used as the
/// project name unless the package manifest names one.
#[instrument(skip(store), level = "debug")]
pub async fn detect_project<S>(store: &S, name: &str) -> Detection
where
    S: RemoteStore,
{
    let mut failures = Vec::new();
    let evidence = gather(store, &mut failures).await;
    let info = classify(name, &evidence);
    debug!("classified {name:?} as {}", info.project_type);

    Detection { info, failures }
}

async fn gather<S>(store: &S, failures: &mut Vec<ProbeFailure>) -> Evidence
where
    S: RemoteStore,
{
    let mut evidence = Evidence::default();
    for entry in list_dir(store, "", failures).await {
        match entry.kind {
            EntryKind::File => evidence.root_files.insert(entry.name),
            EntryKind::Directory => evidence.root_dirs.insert(entry.name),
        };
    }

    if evidence.root_dirs.contains("src") {
        evidence.nested_dirs.extend(
            list_dir(store, "src", failures)
                .await
                .into_iter()
                .filter(|entry| entry.kind == EntryKind::Directory)
                .map(|entry| format!("src/{}", entry.name)),
        );
    }

    if evidence.root_files.contains(PACKAGE_MANIFEST) {
        if let Some(text) = read_text(store, PACKAGE_MANIFEST, failures).await {
            match serde_json::from_str::<PackageManifest>(&text) {
                Ok(package) => evidence.package = Some(package),
                Err(error) => record(failures, PACKAGE_MANIFEST, error),
            }
        }
    }

    if evidence.root_files.contains(REQUIREMENTS) {
        evidence.requirements = read_text(store, REQUIREMENTS, failures).await;
    }

    evidence
}

async fn list_dir<S>(store: &S, path: &str, failures: &mut Vec<ProbeFailure>) -> Vec<RemoteEntry>
where
    S: RemoteStore,
{
    match store.get(path).await {
        Ok(RemoteContent::Directory(entries)) => entries,
        Ok(RemoteContent::File(_)) => {
            record(failures, path, "expected a directory, found a file");
            Vec::new()
        }
        // INVARIANT: An empty repository has no root to list.
        Err(StoreError::NotFound { .. }) => {
            debug!("nothing to list at {path:?}");
            Vec::new()
        }
        Err(error) => {
            record(failures, path, error);
            Vec::new()
        }
    }
}

async fn read_text<S>(store: &S, path: &str, failures: &mut Vec<ProbeFailure>) -> Option<String>
where
    S: RemoteStore,
{
    let file = match store.get(path).await {
        Ok(RemoteContent::File(file)) => file,
        Ok(RemoteContent::Directory(_)) => {
            record(failures, path, "expected a file, found a directory");
            return None;
        }
        Err(error) => {
            record(failures, path, error);
            return None;
        }
    };

    match String::from_utf8(file.bytes) {
        Ok(text) => Some(text),
        Err(error) => {
            record(failures, path, error);
            None
        }
    }
}

fn record(failures: &mut Vec<ProbeFailure>, path: &str, reason: impl Display) {
    warn!("probe of {path:?} failed: {reason}");
    failures.push(ProbeFailure {
        path: path.into(),
        reason: reason.to_string(),
    });
}

/// Classify project from gathered evidence.
pub fn classify(name: &str, evidence: &Evidence) -> ProjectInfo {
    let deps = evidence
        .package
        .as_ref()
        .map(PackageManifest::dependency_names)
        .unwrap_or_default();
    let has = |dep: &str| deps.contains(dep);
    let is_python = PYTHON_MANIFESTS
        .iter()
        .any(|file| evidence.root_files.contains(*file));
    let has_workspace = WORKSPACE_MANIFESTS
        .iter()
        .any(|file| evidence.root_files.contains(*file));

    let mut technologies = Vec::new();
    let mut framework = None;
    let mut language = None;

    if let Some(package) = &evidence.package {
        for (dep, tech) in [
            ("react", "React"),
            ("next", "Next.js"),
            ("react-native", "React Native"),
            ("expo", "Expo"),
        ] {
            if has(dep) {
                technologies.push(tech.to_string());
            }
        }

        framework = if has("react-native") {
            Some("React Native")
        } else if has("next") {
            Some("Next.js")
        } else if has("react") {
            Some("React")
        } else {
            None
        };

        if has("typescript") || evidence.root_files.contains(TSCONFIG) {
            technologies.push("TypeScript".into());
            language = Some("TypeScript");
        } else {
            language = Some("JavaScript");
        }

        if let Some(server) = node_server(&deps) {
            technologies.push(server.into());
            framework = framework.or(Some(server));
        }

        let extras = [
            first_of(&deps, &[("tailwindcss", "TailwindCSS")]),
            first_of(
                &deps,
                &[
                    ("redux", "Redux"),
                    ("@reduxjs/toolkit", "Redux"),
                    ("zustand", "Zustand"),
                    ("mobx", "MobX"),
                ],
            ),
            first_of(&deps, &[("vite", "Vite"), ("webpack", "Webpack")]),
        ];
        technologies.extend(extras.into_iter().flatten().map(String::from));
        debug!("package {:?} has {} dependencies", package.name, deps.len());
    }

    if is_python {
        technologies.push("Python".into());
        language = Some("Python");
        let requirements = evidence
            .requirements
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        if let Some(python) = ["Django", "Flask", "FastAPI"]
            .into_iter()
            .find(|tech| requirements.contains(&tech.to_lowercase()))
        {
            technologies.push(python.into());
            framework = Some(python);
        }
    }

    if has_workspace {
        technologies.push("Monorepo".into());
    }

    let project_type = if has("expo") {
        ProjectType::MobileExpo
    } else if has("react-native") {
        ProjectType::MobileReactNative
    } else if has("next") {
        ProjectType::FrontendNextjs
    } else if has("react") {
        ProjectType::FrontendReact
    } else if is_python {
        ProjectType::BackendPython
    } else if node_server(&deps).is_some() {
        ProjectType::BackendNodejs
    } else if has_workspace {
        ProjectType::Monorepo
    } else {
        ProjectType::Unknown
    };

    let dir = |name: &str| evidence.root_dirs.contains(name) || evidence.nested_dirs.contains(name);
    let structure = Structure {
        has_components: dir("components") || dir("src/components"),
        has_pages: dir("pages") || dir("app") || dir("src/pages"),
        has_api: dir("api") || dir("src/api") || dir("src/routes"),
        has_models: dir("models") || dir("src/models"),
        is_monorepo: has_workspace
            || dir("packages")
            || (evidence.root_dirs.contains("frontend") && evidence.root_dirs.contains("backend")),
    };

    let package_manager = LOCK_FILES
        .iter()
        .find(|(lock, _)| evidence.root_files.contains(*lock))
        .map(|(_, manager)| manager.to_string());

    let package = evidence.package.as_ref();
    ProjectInfo {
        project_type,
        name: package
            .and_then(|package| package.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| name.to_string()),
        version: package.and_then(|package| package.version.clone()),
        description: package.and_then(|package| package.description.clone()),
        technologies,
        structure,
        package_manager,
        framework: framework.map(String::from),
        language: language.map(String::from),
    }
}

fn node_server(deps: &BTreeSet<String>) -> Option<&'static str> {
    first_of(
        deps,
        &[("express", "Express"), ("fastify", "Fastify"), ("koa", "Koa")],
    )
}

fn first_of(deps: &BTreeSet<String>, table: &[(&str, &'static str)]) -> Option<&'static str> {
    table
        .iter()
        .find(|(dep, _)| deps.contains(*dep))
        .map(|(_, tech)| *tech)
}

/// Everything gathered from a repository before classification.
#[derive(Debug, Default, Clone)]
pub struct Evidence {
    /// File names at repository root.
    pub root_files: BTreeSet<String>,

    /// Directory names at repository root.
    pub root_dirs: BTreeSet<String>,

    /// Directories directly under `src`, e.g., `src/components`.
    pub nested_dirs: BTreeSet<String>,

    /// Parsed `package.json`.
    pub package: Option<PackageManifest>,

    /// Raw `requirements.txt`.
    pub requirements: Option<String>,
}

/// Fields of `package.json` that classification cares about.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,

    #[serde(default)]
    pub dependencies: Map<String, Value>,

    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: Map<String, Value>,
}

impl PackageManifest {
    fn dependency_names(&self) -> BTreeSet<String> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .cloned()
            .collect()
    }
}

/// Result of detection, complete or not.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    /// Classification of whatever could be probed.
    pub info: ProjectInfo,

    /// Probes that broke along the way.
    pub failures: Vec<ProbeFailure>,
}

/// Probe that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub path: String,
    pub reason: String,
}

impl Display for ProbeFailure {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}: {}", self.path, self.reason)
    }
}

/// Classification of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub structure: Structure,
    pub package_manager: Option<String>,
    pub framework: Option<String>,
    pub language: Option<String>,
}

impl ProjectInfo {
    /// Construct unclassified project info.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            project_type: ProjectType::Unknown,
            name: name.into(),
            version: None,
            description: None,
            technologies: Vec::new(),
            structure: Structure::default(),
            package_manager: None,
            framework: None,
            language: None,
        }
    }
}

/// Directory layout flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Structure {
    pub has_components: bool,
    pub has_pages: bool,
    pub has_api: bool,
    pub has_models: bool,
    pub is_monorepo: bool,
}

/// Known project kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    MobileExpo,
    MobileReactNative,
    FrontendNextjs,
    FrontendReact,
    BackendPython,
    BackendNodejs,
    Monorepo,
    Unknown,
}

impl ProjectType {
    pub fn is_mobile(&self) -> bool {
        matches!(self, Self::MobileExpo | Self::MobileReactNative)
    }

    pub fn is_frontend(&self) -> bool {
        matches!(self, Self::FrontendNextjs | Self::FrontendReact)
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, Self::BackendPython | Self::BackendNodejs)
    }

    /// Kebab-case name as written into documentation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MobileExpo => "mobile-expo",
            Self::MobileReactNative => "mobile-react-native",
            Self::FrontendNextjs => "frontend-nextjs",
            Self::FrontendReact => "frontend-react",
            Self::BackendPython => "backend-python",
            Self::BackendNodejs => "backend-nodejs",
            Self::Monorepo => "monorepo",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for ProjectType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn package(deps: &[&str]) -> PackageManifest {
        PackageManifest {
            dependencies: deps
                .iter()
                .map(|dep| (dep.to_string(), Value::String("^1.0.0".into())))
                .collect(),
            ..Default::default()
        }
    }

    fn evidence(files: &[&str], deps: Option<&[&str]>) -> Evidence {
        Evidence {
            root_files: files.iter().map(|file| file.to_string()).collect(),
            package: deps.map(package),
            ..Default::default()
        }
    }

    #[test_case(&["react", "react-native", "expo"], ProjectType::MobileExpo; "expo beats react native")]
    #[test_case(&["react", "react-native"], ProjectType::MobileReactNative; "react native beats react")]
    #[test_case(&["react", "next", "express"], ProjectType::FrontendNextjs; "next beats express")]
    #[test_case(&["react", "express"], ProjectType::FrontendReact; "react beats express")]
    #[test_case(&["fastify"], ProjectType::BackendNodejs; "node server")]
    #[test_case(&["lodash"], ProjectType::Unknown; "nothing known")]
    #[test]
    fn classify_package_type(deps: &[&str], expect: ProjectType) {
        let info = classify("demo", &evidence(&[PACKAGE_MANIFEST], Some(deps)));
        assert_eq!(info.project_type, expect);
    }

    #[test]
    fn classify_python_beats_node_backend() {
        let mut evidence = evidence(&[PACKAGE_MANIFEST, REQUIREMENTS], Some(&["express"]));
        evidence.requirements = Some("Django==5.0\ncelery\n".into());
        let info = classify("demo", &evidence);

        assert_eq!(info.project_type, ProjectType::BackendPython);
        assert_eq!(info.language.as_deref(), Some("Python"));
        assert_eq!(info.framework.as_deref(), Some("Django"));
        assert_eq!(info.technologies, ["Express", "Python", "Django"].map(String::from));
    }

    #[test]
    fn classify_workspace_manifest_as_monorepo() {
        let info = classify("demo", &evidence(&["turbo.json"], None));
        assert_eq!(info.project_type, ProjectType::Monorepo);
        assert!(info.structure.is_monorepo);
        assert_eq!(info.technologies, vec!["Monorepo".to_string()]);
    }

    #[test]
    fn classify_frontend_keeps_monorepo_flag() {
        let info = classify("demo", &evidence(&[PACKAGE_MANIFEST, "lerna.json"], Some(&["react"])));
        assert_eq!(info.project_type, ProjectType::FrontendReact);
        assert!(info.structure.is_monorepo);
    }

    #[test]
    fn classify_language_and_tooling() {
        let mut evidence = evidence(
            &[PACKAGE_MANIFEST, TSCONFIG, "yarn.lock", "package-lock.json"],
            Some(&["react", "vite", "webpack", "zustand", "tailwindcss"]),
        );
        if let Some(package) = evidence.package.as_mut() {
            package.name = Some("web-app".into());
            package.version = Some("2.1.0".into());
        }
        let info = classify("repo", &evidence);

        assert_eq!(info.name, "web-app");
        assert_eq!(info.version.as_deref(), Some("2.1.0"));
        assert_eq!(info.language.as_deref(), Some("TypeScript"));
        assert_eq!(info.framework.as_deref(), Some("React"));
        assert_eq!(info.package_manager.as_deref(), Some("yarn"));
        assert_eq!(
            info.technologies,
            ["React", "TypeScript", "TailwindCSS", "Zustand", "Vite"].map(String::from)
        );
    }

    #[test]
    fn classify_structure_flags() {
        let evidence = Evidence {
            root_dirs: ["app", "frontend", "backend", "src"].map(String::from).into(),
            nested_dirs: ["src/components", "src/routes", "src/models"]
                .map(String::from)
                .into(),
            ..Default::default()
        };
        let info = classify("demo", &evidence);

        assert_eq!(
            info.structure,
            Structure {
                has_components: true,
                has_pages: true,
                has_api: true,
                has_models: true,
                is_monorepo: true,
            }
        );
        assert_eq!(info.project_type, ProjectType::Unknown);
        assert_eq!(info.language, None);
    }

    #[test]
    fn project_type_serializes_kebab_case() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::to_value(ProjectType::MobileReactNative)?,
            Value::String("mobile-react-native".into())
        );
        assert_eq!(ProjectType::FrontendNextjs.to_string(), "frontend-nextjs");

        Ok(())
    }
}
