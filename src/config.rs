// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout and resolution.
//!
//! Ghkeep keeps the memory of many projects inside __one__ GitHub
//! repository. Configuration is thus split in two tiers:
//!
//! 1. The __global identity__ names the repository, and the token used to
//!    reach it. It comes from the `GITHUB_TOKEN`, `GITHUB_OWNER`, and
//!    `GITHUB_REPO` environment variables, or from the persisted global file
//!    at `$XDG_CONFIG_HOME/ghkeep/config.toml`. Environment variables always
//!    win when all three are set.
//! 2. The __local namespace__ names the folder inside the repository that
//!    belongs to the current project. It comes from a `.ghkeep.toml` marker
//!    file found by walking up from the working directory. The nearest marker
//!    wins.
//!
//! # Leniency
//!
//! A broken global file is treated as if it did not exist at all, while a
//! broken local marker aborts resolution. The two tiers are deliberately kept
//! this way for compatibility with existing setups.

use crate::path::normalize;

use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::{Debug, Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_dir, read_to_string, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

/// Name of local namespace marker file.
pub const LOCAL_MARKER: &str = ".ghkeep.toml";

/// Environment variable holding the access token.
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Environment variable holding the repository owner.
pub const OWNER_VAR: &str = "GITHUB_OWNER";

/// Environment variable holding the repository name.
pub const REPOSITORY_VAR: &str = "GITHUB_REPO";

/// Identity of the one repository that holds every namespace.
///
/// All three fields must be non-empty for the identity to be usable.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlobalIdentity {
    /// Access token for the hosting API.
    #[serde(default)]
    pub token: String,

    /// User or organization owning the repository.
    #[serde(default)]
    pub owner: String,

    /// Name of the repository.
    #[serde(default)]
    pub repository: String,
}

impl GlobalIdentity {
    /// Construct new global identity.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repository: repository.into(),
        }
    }

    /// Build identity out of environment variables.
    ///
    /// Returns `None` unless all three variables are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let identity = Self::new(
            env::var(TOKEN_VAR).ok()?,
            env::var(OWNER_VAR).ok()?,
            env::var(REPOSITORY_VAR).ok()?,
        );

        identity.is_complete().then_some(identity)
    }

    /// Check that no field is empty.
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.owner.is_empty() && !self.repository.is_empty()
    }

    /// Repository slug in `owner/repository` form.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }

    /// Serialize identity into global file layout.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::ser::to_string_pretty(self)?)
    }
}

impl FromStr for GlobalIdentity {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(toml::de::from_str(data)?)
    }
}

impl Debug for GlobalIdentity {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("GlobalIdentity")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .finish()
    }
}

/// Where the global identity came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Environment variables.
    Environment,

    /// Persisted global file.
    File(PathBuf),
}

impl Display for IdentitySource {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Environment => fmt.write_str("environment variables"),
            Self::File(path) => write!(fmt, "{}", path.display()),
        }
    }
}

/// Local namespace marker layout.
///
/// Only the namespace is required. The project name falls back to the
/// namespace when absent.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LocalMarker {
    /// Folder inside the repository that belongs to the project.
    #[serde(default)]
    pub namespace: String,

    /// Human readable project name.
    pub project_name: Option<String>,
}

impl FromStr for LocalMarker {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(toml::de::from_str(data)?)
    }
}

impl Display for LocalMarker {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Local namespace of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNamespace {
    /// Folder inside the repository that belongs to the project.
    pub namespace: String,

    /// Human readable project name.
    pub project_name: String,

    /// Absolute path to directory holding the marker file.
    pub project_path: PathBuf,
}

/// Global identity merged with optional local namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedConfig {
    /// Repository identity.
    pub identity: GlobalIdentity,

    /// Source the identity was loaded from.
    pub source: IdentitySource,

    /// Namespace of current project, if any.
    pub local: Option<LocalNamespace>,
}

impl MergedConfig {
    /// Active namespace, empty when operating on repository root.
    pub fn namespace(&self) -> &str {
        self.local
            .as_ref()
            .map(|local| local.namespace.as_str())
            .unwrap_or_default()
    }
}

/// Two-tier configuration resolver.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    global_file: PathBuf,
}

impl ConfigResolver {
    /// Construct new resolver reading global file at target path.
    pub fn new(global_file: impl Into<PathBuf>) -> Self {
        Self {
            global_file: global_file.into(),
        }
    }

    /// Construct new resolver for default global file location.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if configuration directory cannot
    ///   be determined.
    pub fn try_default() -> Result<Self> {
        Ok(Self::new(crate::path::default_global_config_file()?))
    }

    /// Path to persisted global file.
    pub fn global_file(&self) -> &Path {
        self.global_file.as_path()
    }

    /// Resolve merged configuration for target starting directory.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ConfigMissing`] if no global identity exists.
    /// - Return [`ConfigError::InvalidLocalConfig`] if the nearest local
    ///   marker is malformed.
    pub fn resolve(&self, start: impl AsRef<Path>) -> Result<MergedConfig> {
        let (identity, source) = self.load_identity()?;
        info!("using repository {} from {source}", identity.slug());

        let local = find_local(start)?;
        match &local {
            Some(local) => info!(
                "using namespace {:?} from {}",
                local.namespace,
                local.project_path.display()
            ),
            None => info!("no local namespace found, using repository root"),
        }

        Ok(MergedConfig {
            identity,
            source,
            local,
        })
    }

    /// Load global identity alone.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ConfigMissing`] if no global identity exists.
    pub fn load_identity(&self) -> Result<(GlobalIdentity, IdentitySource)> {
        if let Some(identity) = GlobalIdentity::from_env() {
            return Ok((identity, IdentitySource::Environment));
        }

        self.load_global_file()
            .map(|identity| (identity, IdentitySource::File(self.global_file.clone())))
            .ok_or(ConfigError::ConfigMissing)
    }

    /// Persist global identity.
    ///
    /// Creates parent directories when missing. On unix systems the file is
    /// only readable by its owner, because it contains a secret.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Serialize`] if serialization fails.
    /// - Return [`ConfigError::Write`] if file cannot be written.
    pub fn save_global(&self, identity: &GlobalIdentity) -> Result<()> {
        let contents = identity.to_toml()?;
        if let Some(parent) = self.global_file.parent() {
            mkdirp::mkdirp(parent).map_err(|source| ConfigError::Write {
                source,
                path: parent.to_path_buf(),
            })?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options
            .open(&self.global_file)
            .and_then(|mut file| {
                // INVARIANT: Mode only applies on creation, so an existing
                // file gets tightened explicitly.
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
                }
                file.write_all(contents.as_bytes())
            })
            .map_err(|source| ConfigError::Write {
                source,
                path: self.global_file.clone(),
            })?;
        info!("global config saved to {}", self.global_file.display());

        Ok(())
    }

    fn load_global_file(&self) -> Option<GlobalIdentity> {
        let data = match read_to_string(&self.global_file) {
            Ok(data) => data,
            Err(error) => {
                debug!("no global file at {}: {error}", self.global_file.display());
                return None;
            }
        };

        match data.parse::<GlobalIdentity>() {
            Ok(identity) if identity.is_complete() => Some(identity),
            Ok(_) => {
                debug!("global file {} is incomplete", self.global_file.display());
                None
            }
            Err(error) => {
                debug!("global file {} is malformed: {error}", self.global_file.display());
                None
            }
        }
    }
}

/// Find nearest local namespace marker.
///
/// Walks from `start` through each of its ancestors up to the filesystem
/// root, stopping at the first marker found. The start path is normalized
/// lexically first, so `inner/..` starts at the parent of `inner`.
///
/// # Errors
///
/// - Return [`ConfigError::InvalidLocalConfig`] if the marker found cannot
///   be read, parsed, or lacks a namespace.
/// - Return [`ConfigError::Read`] if `start` cannot be made absolute.
pub fn find_local(start: impl AsRef<Path>) -> Result<Option<LocalNamespace>> {
    let start = std::path::absolute(start.as_ref()).map_err(|source| ConfigError::Read {
        source,
        path: start.as_ref().to_path_buf(),
    })?;

    // INVARIANT: Only true ancestors are searched, so `..` must be folded
    // before walking upward.
    let start = normalize(&start);

    for dir in start.ancestors() {
        let marker_path = dir.join(LOCAL_MARKER);
        if !marker_path.exists() {
            continue;
        }

        debug!("found local marker at {}", marker_path.display());
        return load_local(&marker_path, dir).map(Some);
    }

    Ok(None)
}

fn load_local(marker_path: &Path, dir: &Path) -> Result<LocalNamespace> {
    let invalid = |reason: String| ConfigError::InvalidLocalConfig {
        path: marker_path.to_path_buf(),
        reason,
    };

    let data = read_to_string(marker_path).map_err(|error| invalid(error.to_string()))?;
    let marker: LocalMarker = data.parse().map_err(|error: ConfigError| invalid(error.to_string()))?;
    if marker.namespace.is_empty() {
        return Err(invalid("missing 'namespace' field".into()));
    }

    // INVARIANT: Project name always falls back to namespace.
    let project_name = marker
        .project_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| marker.namespace.clone());

    Ok(LocalNamespace {
        namespace: marker.namespace,
        project_name,
        project_path: dir.to_path_buf(),
    })
}

/// Create local namespace marker in target directory.
///
/// Returns path to the new marker file.
///
/// # Errors
///
/// - Return [`ConfigError::InvalidLocalConfig`] if namespace is empty.
/// - Return [`ConfigError::LocalExists`] if marker exists and `force` is off.
/// - Return [`ConfigError::Write`] if marker cannot be written.
pub fn create_local(
    dir: impl AsRef<Path>,
    namespace: impl Into<String>,
    project_name: Option<String>,
    force: bool,
) -> Result<PathBuf> {
    let path = dir.as_ref().join(LOCAL_MARKER);
    let namespace = namespace.into();
    if namespace.is_empty() {
        return Err(ConfigError::InvalidLocalConfig {
            path,
            reason: "namespace cannot be empty".into(),
        });
    }

    if path.exists() && !force {
        return Err(ConfigError::LocalExists { path });
    }

    let marker = LocalMarker {
        project_name: Some(project_name.unwrap_or_else(|| namespace.clone())),
        namespace,
    };
    std::fs::write(&path, marker.to_string()).map_err(|source| ConfigError::Write {
        source,
        path: path.clone(),
    })?;
    info!("local config created at {}", path.display());

    Ok(path)
}

/// Project registered through a local marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEntry {
    /// Project name, or directory name when the marker gives none.
    pub name: String,

    /// Namespace of project.
    pub namespace: String,

    /// Directory holding the marker.
    pub path: PathBuf,
}

/// List projects in immediate subdirectories of target directory.
///
/// Subdirectories with broken markers are skipped. Entries are sorted by
/// name.
///
/// # Errors
///
/// - Return [`ConfigError::Read`] if target directory cannot be read.
pub fn list_projects(dir: impl AsRef<Path>) -> Result<Vec<ProjectEntry>> {
    let dir = dir.as_ref();
    let entries = read_dir(dir).map_err(|source| ConfigError::Read {
        source,
        path: dir.to_path_buf(),
    })?;

    let mut projects = Vec::new();
    for entry in entries.flatten() {
        let project_path = entry.path();
        let marker_path = project_path.join(LOCAL_MARKER);
        if !project_path.is_dir() || !marker_path.exists() {
            continue;
        }

        match load_local(&marker_path, &project_path) {
            Ok(local) => projects.push(ProjectEntry {
                name: local.project_name,
                namespace: local.namespace,
                path: local.project_path,
            }),
            Err(error) => debug!("skip project: {error}"),
        }
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(projects)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No usable global identity.
    #[error(
        "no global configuration found, set GITHUB_TOKEN, GITHUB_OWNER, and GITHUB_REPO or run 'ghkeep init'"
    )]
    ConfigMissing,

    /// Local marker is malformed.
    #[error("invalid local config at {:?}: {reason}", path.display())]
    InvalidLocalConfig { path: PathBuf, reason: String },

    /// Local marker already exists.
    #[error("local config already exists at {:?}, use --force to overwrite", path.display())]
    LocalExists { path: PathBuf },

    /// Configuration directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Path cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Path cannot be written to.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
