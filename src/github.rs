// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote store backed by the GitHub REST API.
//!
//! File content goes through the repository contents endpoints, i.e.,
//! `/repos/{owner}/{repo}/contents/{path}`, where content travels as base64
//! and the blob SHA serves as the optimistic concurrency token. Search goes
//! through the code search endpoint, always restricted to the configured
//! repository.
//!
//! # See Also
//!
//! - [Repository contents](https://docs.github.com/en/rest/repos/contents)
//! - [Code search](https://docs.github.com/en/rest/search/search#search-code)

use crate::{
    config::GlobalIdentity,
    store::{CommitRef, EntryKind, RemoteContent, RemoteEntry, RemoteFile, RemoteStore, Result, StoreError},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client, Response, StatusCode, Url,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const SEARCH_PAGE_SIZE: &str = "30";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote store talking to one GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubStore {
    client: Client,
    base: Url,
    owner: String,
    repository: String,
}

impl GitHubStore {
    /// Construct new store for repository named by identity.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidToken`] if token is not a valid header.
    /// - Return [`StoreError::Http`] if HTTP client cannot be built.
    pub fn new(identity: &GlobalIdentity) -> Result<Self> {
        Self::with_api_url(identity, DEFAULT_API_URL)
    }

    /// Construct new store against custom API endpoint, e.g., GitHub
    /// Enterprise.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::InvalidUrl`] if endpoint is not a valid URL.
    /// - Return [`StoreError::InvalidToken`] if token is not a valid header.
    /// - Return [`StoreError::Http`] if HTTP client cannot be built.
    pub fn with_api_url(identity: &GlobalIdentity, api_url: &str) -> Result<Self> {
        let base = Url::parse(api_url).map_err(|_| StoreError::InvalidUrl(api_url.into()))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", identity.token))
            .map_err(|_| StoreError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghkeep/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base,
            owner: identity.owner.clone(),
            repository: identity.repository.clone(),
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidUrl(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }

        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        // INVARIANT: Empty segments never reach the API, so "ns/" lists "ns".
        let segments = ["repos", self.owner.as_str(), self.repository.as_str(), "contents"]
            .into_iter()
            .chain(path.split('/').filter(|segment| !segment.is_empty()));
        self.endpoint(segments)
    }

    fn search_query(&self, query: &str, scope: Option<&str>) -> String {
        let mut q = format!("{query} repo:{}/{}", self.owner, self.repository);
        if let Some(scope) = scope.map(|scope| scope.trim_matches('/')).filter(|s| !s.is_empty()) {
            q.push_str(&format!(" path:{scope}"));
        }
        q
    }

    async fn fetch_raw(&self, path: &str, download_url: &str) -> Result<Vec<u8>> {
        debug!("fetch raw content of {path:?}");
        let response = self.client.get(download_url).send().await?;
        let response = check_status(response, path).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RemoteStore for GitHubStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, path: &str) -> Result<RemoteContent> {
        let response = self.client.get(self.contents_url(path)?).send().await?;
        let response = check_status(response, path).await?;
        let payload: ContentsPayload = response.json().await?;

        match payload {
            ContentsPayload::Single(entry) if entry.encoding.as_deref() == Some("none") => {
                // Files above one megabyte come without inline content.
                let download_url = entry.download_url.clone().ok_or_else(|| {
                    StoreError::Decode(format!("{path:?} has neither content nor download url"))
                })?;
                let bytes = self.fetch_raw(path, &download_url).await?;
                Ok(RemoteContent::File(RemoteFile {
                    path: entry.path,
                    sha: entry.sha,
                    bytes,
                }))
            }
            payload => payload.into_content(),
        }
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        previous: Option<&str>,
    ) -> Result<CommitRef> {
        let body = PutBody {
            message,
            content: STANDARD.encode(content),
            sha: previous,
        };
        let response = self
            .client
            .put(self.contents_url(path)?)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, path).await?;
        let payload: CommitPayload = response.json().await?;

        Ok(payload.commit)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, path: &str, message: &str, sha: &str) -> Result<CommitRef> {
        let body = DeleteBody { message, sha };
        let response = self
            .client
            .delete(self.contents_url(path)?)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, path).await?;
        let payload: CommitPayload = response.json().await?;

        Ok(payload.commit)
    }

    #[instrument(skip(self), level = "debug")]
    async fn search_code(&self, query: &str, scope: Option<&str>) -> Result<Vec<String>> {
        let q = self.search_query(query, scope);
        let response = self
            .client
            .get(self.endpoint(["search", "code"])?)
            .query(&[("q", q.as_str()), ("per_page", SEARCH_PAGE_SIZE)])
            .send()
            .await?;
        let response = check_status(response, query).await?;
        let payload: SearchPayload = response.json().await?;
        debug!("code search for {q:?} found {} hits", payload.items.len());

        Ok(payload.items.into_iter().map(|item| item.path).collect())
    }
}

async fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound { path: path.into() }),
        StatusCode::CONFLICT => Err(StoreError::Conflict { path: path.into() }),
        _ => {
            let message = response
                .json::<ApiMessage>()
                .await
                .map(|payload| payload.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").into());
            Err(StoreError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>> {
    // INVARIANT: GitHub wraps base64 payloads every 60 characters.
    let compact = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    STANDARD
        .decode(compact)
        .map_err(|error| StoreError::Decode(error.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsPayload {
    Listing(Vec<EntryPayload>),
    Single(EntryPayload),
}

impl ContentsPayload {
    fn into_content(self) -> Result<RemoteContent> {
        match self {
            Self::Listing(entries) => Ok(RemoteContent::Directory(
                entries.into_iter().filter_map(EntryPayload::into_entry).collect(),
            )),
            Self::Single(entry) if entry.kind == "file" => {
                let bytes = match entry.content.as_deref() {
                    Some(content) => decode_base64(content)?,
                    None => Vec::new(),
                };
                Ok(RemoteContent::File(RemoteFile {
                    path: entry.path,
                    sha: entry.sha,
                    bytes,
                }))
            }
            Self::Single(entry) => Err(StoreError::Decode(format!(
                "{:?} is a {}, which is not supported",
                entry.path, entry.kind
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntryPayload {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    sha: String,
    content: Option<String>,
    encoding: Option<String>,
    download_url: Option<String>,
}

impl EntryPayload {
    // INVARIANT: Symlinks and submodules cannot be read as files, so they
    // never show up in listings.
    fn into_entry(self) -> Option<RemoteEntry> {
        let kind = match self.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Directory,
            other => {
                debug!("skip {:?}, entries of type {other} are not supported", self.path);
                return None;
            }
        };

        Some(RemoteEntry {
            name: self.name,
            path: self.path,
            kind,
            size: self.size,
        })
    }
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}
