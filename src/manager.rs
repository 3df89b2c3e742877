// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Namespace-aware file management over a remote store.
//!
//! The [`FileManager`] is the operational core of ghkeep. Callers always hand
//! it __logical__ paths, which get resolved against the active namespace
//! right before they reach the remote store. Paths reported back to callers
//! are logical again.
//!
//! # Write Protocol
//!
//! Mutations never trust anything fetched earlier. Each write, create, or
//! delete first fetches the current content hash of its target, then hands
//! that hash back to the store. No lock is held in between, so two writers
//! can still race. The store rejects the loser with a stale hash, which is
//! surfaced as [`ErrorKind::ConflictStale`] and never retried here.
//!
//! # Project Configuration
//!
//! Each namespace may carry a `config.json` at its root. Its keys can be
//! changed through dot-notation, e.g., `team.lead`, where missing mappings
//! are created along the way, and non-mapping values in the way are replaced
//! by fresh mappings.

use crate::{
    config::MergedConfig,
    github::GitHubStore,
    path::{resolve, strip_namespace},
    store::{CommitRef, EntryKind, RemoteContent, RemoteEntry, RemoteFile, RemoteStore, StoreError},
};

use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, info, instrument, warn};

/// Name of project configuration file at namespace root.
pub const CONFIG_FILE: &str = "config.json";

/// Number of search hits re-fetched at once.
const SEARCH_CONCURRENCY: usize = 4;

/// File manager scoped to one namespace of a remote store.
#[derive(Debug, Clone)]
pub struct FileManager<S = GitHubStore>
where
    S: RemoteStore,
{
    store: S,
    namespace: String,
}

impl<S> FileManager<S>
where
    S: RemoteStore,
{
    /// Construct new file manager.
    ///
    /// An empty namespace targets the repository root.
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Active namespace.
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Underlying remote store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read file content as text.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::NotFound`] if nothing exists at path.
    /// - Return [`ErrorKind::IsDirectory`] if path is a directory.
    /// - Return [`ErrorKind::Decode`] if content is not valid UTF-8.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_file(&self, path: &str) -> Result<String> {
        self.read_text(path)
            .await
            .map_err(|kind| Error::new(Operation::ReadFile, kind))
    }

    /// Write file, creating it when absent, updating it otherwise.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::IsDirectory`] if path is a directory.
    /// - Return [`ErrorKind::ConflictStale`] if file changed after its hash
    ///   was fetched.
    #[instrument(skip(self, content), level = "debug")]
    pub async fn write_file(&self, path: &str, content: &str, message: &str) -> Result<Confirmation> {
        self.write_text(path, content, message)
            .await
            .map_err(|kind| Error::new(Operation::WriteFile, kind))
    }

    /// Create new file.
    ///
    /// The existence check and the creation are separate calls, so a
    /// concurrent creator can still slip in between.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::AlreadyExists`] if anything exists at path.
    #[instrument(skip(self, content), level = "debug")]
    pub async fn create_file(&self, path: &str, content: &str, message: &str) -> Result<Confirmation> {
        self.create_text(path, content, message)
            .await
            .map_err(|kind| Error::new(Operation::CreateFile, kind))
    }

    /// Delete file.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::NotFound`] if nothing exists at path.
    /// - Return [`ErrorKind::IsDirectory`] if path is a directory.
    /// - Return [`ErrorKind::ConflictStale`] if file changed after its hash
    ///   was fetched.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_file(&self, path: &str, message: &str) -> Result<Confirmation> {
        self.delete_path(path, message)
            .await
            .map_err(|kind| Error::new(Operation::DeleteFile, kind))
    }

    /// List directory.
    ///
    /// Recursive listings are pre-order: every directory is directly
    /// followed by its own subtree. Entries of one directory keep the order
    /// the store hands them out in.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::NotFound`] if nothing exists at path.
    /// - Return [`ErrorKind::NotADirectory`] if path is a file.
    #[instrument(skip(self), level = "debug")]
    pub async fn list_files(&self, path: &str, recursive: bool) -> Result<Vec<FileInfo>> {
        self.list(path, recursive)
            .await
            .map_err(|kind| Error::new(Operation::ListFiles, kind))
    }

    /// Search file content.
    ///
    /// Hits from the store's code index are re-fetched and scanned line by
    /// line, case-insensitively. Hits without any confirmed line are dropped,
    /// since the index may be stale.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::InvalidQuery`] if query is blank.
    /// - Return [`ErrorKind::Store`] if search or re-fetching fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn search_content(&self, query: &str, path: Option<&str>) -> Result<Vec<SearchResult>> {
        self.search(query, path)
            .await
            .map_err(|kind| Error::new(Operation::SearchContent, kind))
    }

    /// Read project configuration.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::NotFound`] if there is no configuration file.
    /// - Return [`ErrorKind::Decode`] if it is not a JSON object.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_project_info(&self) -> Result<Map<String, Value>> {
        self.project_config()
            .await
            .map_err(|kind| Error::new(Operation::GetProjectInfo, kind))
    }

    /// Set configuration key through dot-notation.
    ///
    /// Values are always stored as strings.
    ///
    /// # Errors
    ///
    /// - Return [`ErrorKind::InvalidKey`] if key has an empty segment.
    /// - Return [`ErrorKind::NotFound`] if there is no configuration file.
    /// - Return [`ErrorKind::ConflictStale`] if the file changed meanwhile.
    #[instrument(skip(self), level = "debug")]
    pub async fn update_config(&self, key: &str, value: &str) -> Result<ConfigUpdate> {
        self.set_config(key, value)
            .await
            .map_err(|kind| Error::new(Operation::UpdateConfig, kind))
    }

    async fn fetch(&self, path: &str) -> Result<RemoteContent, ErrorKind> {
        let physical = resolve(&self.namespace, path);
        debug!("fetch {physical:?}");
        self.store
            .get(&physical)
            .await
            .map_err(|error| ErrorKind::from_store(path, error))
    }

    async fn fetch_file(&self, path: &str) -> Result<RemoteFile, ErrorKind> {
        match self.fetch(path).await? {
            RemoteContent::File(file) => Ok(file),
            RemoteContent::Directory(_) => Err(ErrorKind::IsDirectory { path: path.into() }),
        }
    }

    // INVARIANT: Absence is an answer here, not an error.
    async fn probe(&self, path: &str) -> Result<Option<RemoteContent>, ErrorKind> {
        match self.fetch(path).await {
            Ok(content) => Ok(Some(content)),
            Err(ErrorKind::NotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn read_text(&self, path: &str) -> Result<String, ErrorKind> {
        let file = self.fetch_file(path).await?;
        String::from_utf8(file.bytes).map_err(|error| ErrorKind::Decode {
            path: path.into(),
            reason: error.to_string(),
        })
    }

    async fn write_text(&self, path: &str, content: &str, message: &str) -> Result<Confirmation, ErrorKind> {
        let previous = match self.probe(path).await? {
            Some(RemoteContent::File(file)) => Some(file.sha),
            Some(RemoteContent::Directory(_)) => {
                return Err(ErrorKind::IsDirectory { path: path.into() })
            }
            None => None,
        };

        let physical = resolve(&self.namespace, path);
        let commit = self
            .store
            .put(&physical, content.as_bytes(), message, previous.as_deref())
            .await
            .map_err(|error| ErrorKind::from_store(path, error))?;

        let action = match previous {
            Some(_) => Action::Updated,
            None => Action::Created,
        };
        info!("{action} {physical:?} in {}", commit.sha);

        Ok(Confirmation {
            path: path.into(),
            action,
            commit,
        })
    }

    async fn create_text(&self, path: &str, content: &str, message: &str) -> Result<Confirmation, ErrorKind> {
        if self.probe(path).await?.is_some() {
            return Err(ErrorKind::AlreadyExists { path: path.into() });
        }

        let physical = resolve(&self.namespace, path);
        let commit = self
            .store
            .put(&physical, content.as_bytes(), message, None)
            .await
            .map_err(|error| ErrorKind::from_store(path, error))?;
        info!("created {physical:?} in {}", commit.sha);

        Ok(Confirmation {
            path: path.into(),
            action: Action::Created,
            commit,
        })
    }

    async fn delete_path(&self, path: &str, message: &str) -> Result<Confirmation, ErrorKind> {
        let file = self.fetch_file(path).await?;
        let commit = self
            .store
            .delete(&file.path, message, &file.sha)
            .await
            .map_err(|error| ErrorKind::from_store(path, error))?;
        info!("deleted {:?} in {}", file.path, commit.sha);

        Ok(Confirmation {
            path: path.into(),
            action: Action::Deleted,
            commit,
        })
    }

    async fn list(&self, path: &str, recursive: bool) -> Result<Vec<FileInfo>, ErrorKind> {
        let entries = match self.fetch(path).await? {
            RemoteContent::Directory(entries) => entries,
            RemoteContent::File(_) => return Err(ErrorKind::NotADirectory { path: path.into() }),
        };

        // Use DFS with an explicit stack, so each subtree directly follows
        // its directory.
        let mut listing = Vec::new();
        let mut pending = entries.into_iter().rev().collect::<Vec<_>>();
        while let Some(entry) = pending.pop() {
            if recursive && entry.kind == EntryKind::Directory {
                let logical = strip_namespace(&self.namespace, &entry.path);
                match self.store.get(&entry.path).await {
                    Ok(RemoteContent::Directory(children)) => pending.extend(children.into_iter().rev()),
                    Ok(RemoteContent::File(_)) => {
                        return Err(ErrorKind::NotADirectory { path: logical.into() })
                    }
                    Err(error) => return Err(ErrorKind::from_store(logical, error)),
                }
            }
            listing.push(self.file_info(entry));
        }

        Ok(listing)
    }

    fn file_info(&self, entry: RemoteEntry) -> FileInfo {
        let size = match entry.kind {
            EntryKind::File => Some(entry.size),
            EntryKind::Directory => None,
        };

        FileInfo {
            path: strip_namespace(&self.namespace, &entry.path).into(),
            name: entry.name,
            kind: entry.kind,
            size,
        }
    }

    async fn search(&self, query: &str, path: Option<&str>) -> Result<Vec<SearchResult>, ErrorKind> {
        if query.trim().is_empty() {
            return Err(ErrorKind::InvalidQuery);
        }

        let scope = match path {
            Some(path) => Some(resolve(&self.namespace, path)),
            None if !self.namespace.is_empty() => Some(self.namespace.clone()),
            None => None,
        };
        let hits = self
            .store
            .search_code(query, scope.as_deref())
            .await
            .map_err(ErrorKind::Store)?;
        debug!("code index returned {} hits for {query:?}", hits.len());

        let results = stream::iter(hits)
            .map(|physical| self.scan_hit(physical, query))
            .buffered(SEARCH_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(results.into_iter().flatten().collect())
    }

    async fn scan_hit(&self, physical: String, query: &str) -> Result<Option<SearchResult>, ErrorKind> {
        let logical = strip_namespace(&self.namespace, &physical).to_string();
        let file = match self.store.get(&physical).await {
            Ok(RemoteContent::File(file)) => file,
            Ok(RemoteContent::Directory(_)) => {
                debug!("drop search hit {physical:?}, it is a directory");
                return Ok(None);
            }
            Err(StoreError::NotFound { .. }) => {
                debug!("drop search hit {physical:?}, it no longer exists");
                return Ok(None);
            }
            Err(error) => return Err(ErrorKind::from_store(&logical, error)),
        };

        let Ok(text) = String::from_utf8(file.bytes) else {
            debug!("drop search hit {physical:?}, it is not text");
            return Ok(None);
        };

        let matches = match_lines(&text, query);
        if matches.is_empty() {
            debug!("drop search hit {physical:?}, no line matches anymore");
            return Ok(None);
        }

        Ok(Some(SearchResult {
            file: logical,
            matches,
        }))
    }

    async fn project_config(&self) -> Result<Map<String, Value>, ErrorKind> {
        let text = self.read_text(CONFIG_FILE).await?;
        let decode = |reason: String| ErrorKind::Decode {
            path: CONFIG_FILE.into(),
            reason,
        };

        match serde_json::from_str::<Value>(&text).map_err(|error| decode(error.to_string()))? {
            Value::Object(config) => Ok(config),
            _ => Err(decode("expected a JSON object".into())),
        }
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<ConfigUpdate, ErrorKind> {
        if key.split('.').any(str::is_empty) {
            return Err(ErrorKind::InvalidKey(key.into()));
        }

        let mut config = self.project_config().await?;
        set_dotted(&mut config, key, value);

        let mut body = serde_json::to_string_pretty(&Value::Object(config)).map_err(|error| {
            ErrorKind::Decode {
                path: CONFIG_FILE.into(),
                reason: error.to_string(),
            }
        })?;
        body.push('\n');

        let message = format!("Update config: {key} = {value}");
        let confirmation = self.write_text(CONFIG_FILE, &body, &message).await?;

        Ok(ConfigUpdate {
            key: key.into(),
            value: value.into(),
            commit: confirmation.commit,
        })
    }
}

impl FileManager<GitHubStore> {
    /// Construct file manager for merged configuration.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError`] if the GitHub client cannot be built.
    pub fn from_config(config: &MergedConfig) -> Result<Self, StoreError> {
        let store = GitHubStore::new(&config.identity)?;
        Ok(Self::new(store, config.namespace()))
    }
}

/// Set string value at dot-notation key.
///
/// Missing intermediate mappings are created. Any non-mapping value sitting
/// where a mapping is needed gets replaced by an empty mapping.
pub fn set_dotted(config: &mut Map<String, Value>, key: &str, value: &str) {
    let segments = key.split('.').collect::<Vec<_>>();
    set_segments(config, &segments, value);
}

fn set_segments(config: &mut Map<String, Value>, segments: &[&str], value: &str) {
    match segments {
        [] => {}
        [last] => {
            config.insert(last.to_string(), Value::String(value.to_string()));
        }
        [segment, rest @ ..] => {
            let slot = config
                .entry(*segment)
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(next) => set_segments(next, rest, value),
                other => {
                    warn!("replace non-mapping value at {segment:?} with a mapping: {other}");
                    let mut next = Map::new();
                    set_segments(&mut next, rest, value);
                    *other = Value::Object(next);
                }
            }
        }
    }
}

/// Find lines containing query, ignoring case.
///
/// Line numbers start at one. Matched lines are trimmed.
pub fn match_lines(text: &str, query: &str) -> Vec<LineMatch> {
    let needle = query.to_lowercase();
    text.lines()
        .enumerate()
        .filter(|(_, line)| line.to_lowercase().contains(&needle))
        .map(|(index, line)| LineMatch {
            line: index + 1,
            content: line.trim().to_string(),
        })
        .collect()
}

/// Directory entry reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Base name.
    pub name: String,

    /// Logical path.
    pub path: String,

    /// File or directory.
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Size in bytes, files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Search hit confirmed against current content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Logical path of file.
    pub file: String,

    /// Matching lines.
    pub matches: Vec<LineMatch>,
}

/// Single matching line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    /// One-based line number.
    pub line: usize,

    /// Trimmed line text.
    pub content: String,
}

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl Display for Action {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Created => fmt.write_str("created"),
            Self::Updated => fmt.write_str("updated"),
            Self::Deleted => fmt.write_str("deleted"),
        }
    }
}

/// Confirmation of a file mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    /// Logical path.
    pub path: String,

    /// What happened.
    pub action: Action,

    /// Resulting commit.
    pub commit: CommitRef,
}

impl Display for Confirmation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "File {} successfully: {}", self.action, self.commit.html_url)
    }
}

/// Confirmation of a configuration update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigUpdate {
    /// Dot-notation key.
    pub key: String,

    /// New value.
    pub value: String,

    /// Resulting commit.
    pub commit: CommitRef,
}

impl Display for ConfigUpdate {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "Configuration updated: {} = {}", self.key, self.value)
    }
}

/// File manager operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadFile,
    WriteFile,
    CreateFile,
    DeleteFile,
    ListFiles,
    SearchContent,
    GetProjectInfo,
    UpdateConfig,
}

impl Display for Operation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::ReadFile => "read file",
            Self::WriteFile => "write file",
            Self::CreateFile => "create file",
            Self::DeleteFile => "delete file",
            Self::ListFiles => "list files",
            Self::SearchContent => "search content",
            Self::GetProjectInfo => "get project info",
            Self::UpdateConfig => "update config",
        };
        fmt.write_str(name)
    }
}

/// File manager failure tagged with its operation.
#[derive(Debug, thiserror::Error)]
#[error("failed to {operation}: {kind}")]
pub struct Error {
    /// Operation that failed.
    pub operation: Operation,

    /// Cause of failure.
    pub kind: ErrorKind,
}

impl Error {
    /// Construct new operation error.
    pub fn new(operation: Operation, kind: ErrorKind) -> Self {
        Self { operation, kind }
    }
}

/// All possible causes of file manager failure.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Nothing exists at path.
    #[error("{path:?} does not exist")]
    NotFound { path: String },

    /// Path is a directory where a file is needed.
    #[error("{path:?} is a directory, not a file")]
    IsDirectory { path: String },

    /// Path is a file where a directory is needed.
    #[error("{path:?} is a file, not a directory")]
    NotADirectory { path: String },

    /// Path is already taken.
    #[error("{path:?} already exists")]
    AlreadyExists { path: String },

    /// Content hash went stale before the mutation landed.
    #[error("{path:?} changed since it was fetched, fetch it again before retrying")]
    ConflictStale { path: String },

    /// Content is not valid text or JSON.
    #[error("cannot decode {path:?}: {reason}")]
    Decode { path: String, reason: String },

    /// Dot-notation key has an empty segment.
    #[error("invalid config key {0:?}")]
    InvalidKey(String),

    /// Search query is blank.
    #[error("search query cannot be empty")]
    InvalidQuery,

    /// Remote store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl ErrorKind {
    /// Classify store failure for logical path.
    pub fn from_store(path: &str, error: StoreError) -> Self {
        match error {
            StoreError::NotFound { .. } => Self::NotFound { path: path.into() },
            StoreError::Conflict { .. } => Self::ConflictStale { path: path.into() },
            error => Self::Store(error),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
