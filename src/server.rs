// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tool surface over the Model Context Protocol.
//!
//! Exposes the file manager, project configuration, and project
//! initialization as MCP tools. Tool failures never take the server down.
//! They come back to the client as error results reading `Error: <cause>`.

use crate::{
    config::GlobalIdentity,
    github::GitHubStore,
    manager::FileManager,
    scaffold::initialize,
};

use chrono::Local;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};
use tracing::{debug, info};

/// MCP server for one configured repository.
#[derive(Clone)]
pub struct GhkeepServer {
    identity: GlobalIdentity,
    manager: Arc<FileManager<GitHubStore>>,
    tool_router: ToolRouter<Self>,
}

impl GhkeepServer {
    /// Construct new server over file manager.
    ///
    /// The identity names the repository that project initialization
    /// detects and reports on.
    pub fn new(identity: GlobalIdentity, manager: FileManager<GitHubStore>) -> Self {
        Self {
            identity,
            manager: Arc::new(manager),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl GhkeepServer {
    #[tool(description = "Read a file from the project memory repository")]
    pub async fn read_file(
        &self,
        Parameters(request): Parameters<ReadFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(self.manager.read_file(&request.path).await, text))
    }

    #[tool(description = "Write a file, creating it or updating it in place")]
    pub async fn write_file(
        &self,
        Parameters(request): Parameters<WriteFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .manager
            .write_file(&request.path, &request.content, &request.message)
            .await;
        Ok(respond(result, |confirmation| text(confirmation.to_string())))
    }

    #[tool(description = "Create a new file, failing if the path is already taken")]
    pub async fn create_file(
        &self,
        Parameters(request): Parameters<WriteFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .manager
            .create_file(&request.path, &request.content, &request.message)
            .await;
        Ok(respond(result, |confirmation| text(confirmation.to_string())))
    }

    #[tool(description = "Delete a file from the project memory repository")]
    pub async fn delete_file(
        &self,
        Parameters(request): Parameters<DeleteFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .manager
            .delete_file(&request.path, &request.message)
            .await;
        Ok(respond(result, |confirmation| text(confirmation.to_string())))
    }

    #[tool(description = "List files and folders in a directory")]
    pub async fn list_files(
        &self,
        Parameters(request): Parameters<ListFilesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .manager
            .list_files(&request.path, request.recursive)
            .await;
        Ok(respond(result, |listing| pretty(&listing)))
    }

    #[tool(description = "Search file content, optionally below a folder")]
    pub async fn search_content(
        &self,
        Parameters(request): Parameters<SearchContentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .manager
            .search_content(&request.query, request.path.as_deref())
            .await;
        Ok(respond(result, |results| pretty(&results)))
    }

    #[tool(description = "Get project information from config.json")]
    pub async fn get_project_info(&self) -> Result<CallToolResult, McpError> {
        Ok(respond(self.manager.get_project_info().await, |config| {
            pretty(&config)
        }))
    }

    #[tool(description = "Update project configuration, keys support dot notation like section.key")]
    pub async fn update_config(
        &self,
        Parameters(request): Parameters<UpdateConfigRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .manager
            .update_config(&request.key, &request.value)
            .await;
        Ok(respond(result, |update| text(update.to_string())))
    }

    #[tool(
        description = "Detect the project type of the repository and generate its documentation structure"
    )]
    pub async fn init_project(&self) -> Result<CallToolResult, McpError> {
        debug!("initialize project from {}", self.identity.slug());
        let today = Local::now().date_naive();
        let outcome = initialize(&*self.manager, &self.identity.repository, today).await;
        info!(
            "initialized {} with {} files",
            self.identity.slug(),
            outcome.manifest.created.len()
        );

        Ok(pretty(&outcome))
    }
}

#[tool_handler]
impl ServerHandler for GhkeepServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "Project memory kept in the GitHub repository {}. Paths are relative to namespace {:?}.",
                self.identity.slug(),
                self.manager.namespace()
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

/// Request for the `read_file` tool.
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ReadFileRequest {
    /// Path to the file, e.g., docs/README.md.
    pub path: String,
}

/// Request for the `write_file` and `create_file` tools.
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct WriteFileRequest {
    /// Path to the file.
    pub path: String,

    /// Full file content.
    pub content: String,

    /// Commit message.
    pub message: String,
}

/// Request for the `delete_file` tool.
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct DeleteFileRequest {
    /// Path to the file.
    pub path: String,

    /// Commit message.
    pub message: String,
}

/// Request for the `list_files` tool.
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ListFilesRequest {
    /// Directory to list, empty for the root.
    #[serde(default)]
    pub path: String,

    /// List subdirectories too.
    #[serde(default)]
    pub recursive: bool,
}

/// Request for the `search_content` tool.
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchContentRequest {
    /// Text to look for, case-insensitive.
    pub query: String,

    /// Folder to limit the search to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Request for the `update_config` tool.
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct UpdateConfigRequest {
    /// Configuration key, dot notation allowed.
    pub key: String,

    /// New value, stored as a string.
    pub value: String,
}

/// Turn operation result into tool result.
pub fn respond<T, E>(result: Result<T, E>, render: impl FnOnce(T) -> CallToolResult) -> CallToolResult
where
    E: Display,
{
    match result {
        Ok(value) => render(value),
        Err(error) => failure(error),
    }
}

/// Plain text tool result.
pub fn text(body: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(body)])
}

/// Pretty JSON tool result.
pub fn pretty<T>(value: &T) -> CallToolResult
where
    T: Serialize,
{
    respond(serde_json::to_string_pretty(value), text)
}

/// Error tool result.
pub fn failure(error: impl Display) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Error: {error}"))])
}
