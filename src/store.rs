// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote file store contract.
//!
//! Ghkeep never touches a local clone. Every file lives in a __remote
//! store__, i.e., the contents API of a hosted repository. The store is
//! treated as a black box that can fetch, put, and delete content at a
//! physical path, plus search its own code index.
//!
//! # Optimistic Concurrency
//!
//! Each file in the store carries a content hash (its blob SHA). Updating or
//! deleting a file requires handing back the hash that was last seen. The
//! store rejects the call with [`StoreError::Conflict`] if the file changed
//! in the meantime. Omitting the hash on a put asks the store to create a
//! new file.
//!
//! The store's code index is best-effort and may lag behind the actual
//! content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Layer of indirection for remote store access.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetch file or directory listing at physical path.
    async fn get(&self, path: &str) -> Result<RemoteContent>;

    /// Create or update file at physical path.
    ///
    /// Passing `None` as `previous` creates a new file.
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        previous: Option<&str>,
    ) -> Result<CommitRef>;

    /// Delete file at physical path carrying its current content hash.
    async fn delete(&self, path: &str, message: &str, sha: &str) -> Result<CommitRef>;

    /// Search code index, optionally scoped to physical path prefix.
    ///
    /// Returns physical paths of matching files.
    async fn search_code(&self, query: &str, scope: Option<&str>) -> Result<Vec<String>>;
}

/// Content found at a physical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteContent {
    /// Single file.
    File(RemoteFile),

    /// Directory listing in store order.
    Directory(Vec<RemoteEntry>),
}

/// File held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Physical path.
    pub path: String,

    /// Content hash token.
    pub sha: String,

    /// Raw file content.
    pub bytes: Vec<u8>,
}

/// Entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Base name.
    pub name: String,

    /// Physical path.
    pub path: String,

    /// File or directory.
    pub kind: EntryKind,

    /// Size in bytes, only meaningful for files.
    pub size: u64,
}

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    #[serde(rename = "file")]
    File,

    #[serde(rename = "dir")]
    Directory,
}

/// Reference to commit produced by a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitRef {
    /// Commit SHA.
    pub sha: String,

    /// Browser URL of commit.
    pub html_url: String,
}

/// All possible error types for remote store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing exists at path.
    #[error("no content at {path:?}")]
    NotFound { path: String },

    /// Content hash handed to the store no longer matches.
    #[error("content at {path:?} changed since it was last fetched")]
    Conflict { path: String },

    /// Store rejected request.
    #[error("remote store responded with {status}: {message}")]
    Api { status: u16, message: String },

    /// Store payload cannot be decoded.
    #[error("cannot decode remote payload: {0}")]
    Decode(String),

    /// Access token cannot be sent as a header.
    #[error("access token contains characters not allowed in a header")]
    InvalidToken,

    /// Endpoint URL cannot be built.
    #[error("invalid endpoint url {0:?}")]
    InvalidUrl(String),

    /// Transport failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
