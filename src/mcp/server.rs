// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rmcp::handler::server::router::prompt::PromptRouter;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{
    GetPromptRequestParams, GetPromptResult, ListPromptsResult, PaginatedRequestParams,
    PromptMessage, PromptMessageRole, ReadResourceRequestParams, ReadResourceResult,
    ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{
    prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router, ErrorData, RoleServer,
    ServerHandler, ServiceExt,
};
use tracing::{debug, info};

use crate::capture::source_lines;
use crate::launcher::ViewerLauncher;
use crate::model::{NavigationAction, Selection};
use crate::navigation::{self, line_action, NavigationError};
use crate::retrieval::{Retrieval, RetrievalRequest, SelectionRetriever};
use crate::store::StateStore;
use crate::workspace::{Workspace, WorkspaceError};

use super::types::*;

#[derive(Clone)]
pub struct ContextViewerMcp {
    store: Arc<StateStore>,
    workspace: Arc<Workspace>,
    retriever: Arc<SelectionRetriever>,
    launcher: Option<Arc<ViewerLauncher>>,
    viewer_url: Option<String>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

const FILE_URI_PREFIX: &str = "file:///";
const DEFAULT_QUESTION: &str = "What does this code/text do?";

#[tool_router]
impl ContextViewerMcp {
    pub fn new(store: Arc<StateStore>, workspace: Arc<Workspace>) -> Self {
        let retriever = Arc::new(SelectionRetriever::new(Arc::clone(&store)));
        Self::new_with_retriever(store, workspace, retriever)
    }

    pub fn new_with_retriever(
        store: Arc<StateStore>,
        workspace: Arc<Workspace>,
        retriever: Arc<SelectionRetriever>,
    ) -> Self {
        Self {
            store,
            workspace,
            retriever,
            launcher: None,
            viewer_url: None,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    /// Tool server running inside a viewer process reachable at `viewer_url`.
    pub fn with_viewer_url(mut self, viewer_url: impl Into<String>) -> Self {
        self.viewer_url = Some(viewer_url.into());
        self
    }

    /// Tool server that may start its own headless viewer.
    pub fn with_launcher(mut self, launcher: Arc<ViewerLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let launcher = self.launcher.clone();
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        let result = service.waiting().await;
        if let Some(launcher) = launcher {
            launcher.shutdown();
        }
        result?;
        Ok(())
    }

    fn known_viewer_url(&self) -> Option<String> {
        if let Some(url) = &self.viewer_url {
            return Some(url.clone());
        }
        match &self.launcher {
            Some(launcher) => launcher.running_viewer().map(|handle| handle.server_url),
            None => self.store.load().server_url,
        }
    }

    /// Root-relative form of a file argument; the file must exist under the root.
    fn viewer_file_path(&self, path: &str) -> Result<String, ErrorData> {
        let resolved = self.workspace.resolve(path).map_err(workspace_error)?;
        if !resolved.is_file() {
            return Err(workspace_error(WorkspaceError::NotFound {
                path: path.to_owned(),
            }));
        }
        Ok(self.workspace.relative(&resolved))
    }

    /// Contents of a `file:///<root-relative path>` resource.
    fn file_resource(&self, uri: &str) -> Result<ReadResourceResult, ErrorData> {
        let Some(path) = uri.strip_prefix(FILE_URI_PREFIX) else {
            return Err(ErrorData::invalid_params(
                format!("unsupported resource URI: {uri}"),
                None,
            ));
        };
        let file = self.workspace.read_file(path).map_err(workspace_error)?;
        debug!(path = %file.path, is_text = file.is_text, "resource read");
        let text = match file.content {
            Some(content) => content,
            None => format!("Binary file: {} ({} bytes)", file.path, file.size),
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    fn navigate(
        &self,
        path: &str,
        action: NavigationAction,
    ) -> Result<Json<NavigateResponse>, ErrorData> {
        let file_path = self.viewer_file_path(path)?;
        let command =
            navigation::issue(&self.store, &action, &file_path).map_err(navigation_error)?;
        Ok(Json(NavigateResponse::new(command, self.known_viewer_url())))
    }

    /// Open the file viewer (reuses a running one, or starts it); returns its URL for the human
    /// to select lines in.
    #[tool(name = "open_viewer")]
    async fn open_viewer(&self) -> Result<Json<OpenViewerResponse>, ErrorData> {
        if let Some(server_url) = &self.viewer_url {
            return Ok(Json(OpenViewerResponse {
                server_url: server_url.clone(),
                started: false,
                server_pid: std::process::id(),
            }));
        }
        let Some(launcher) = &self.launcher else {
            return Err(ErrorData::internal_error("this server cannot start a viewer", None));
        };
        let handle = launcher
            .ensure_viewer()
            .await
            .map_err(|err| ErrorData::internal_error(err.to_string(), None))?;
        info!(url = %handle.server_url, started = handle.started, "open_viewer");
        Ok(Json(OpenViewerResponse {
            server_url: handle.server_url,
            started: handle.started,
            server_pid: handle.server_pid,
        }))
    }

    /// List a directory under the viewer root (hidden entries omitted).
    #[tool(name = "list_files")]
    async fn list_files(
        &self,
        params: Parameters<ListFilesParams>,
    ) -> Result<Json<ListFilesResponse>, ErrorData> {
        let ListFilesParams { path } = params.0;
        let path = path.unwrap_or_default();
        let entries = self.workspace.list_dir(&path).map_err(workspace_error)?;
        Ok(Json(ListFilesResponse { path, entries }))
    }

    /// Read a file under the viewer root; binary files are reported without content.
    #[tool(name = "read_file")]
    async fn read_file(
        &self,
        params: Parameters<ReadFileParams>,
    ) -> Result<Json<ReadFileResponse>, ErrorData> {
        let ReadFileParams { path } = params.0;
        let file = self.workspace.read_file(&path).map_err(workspace_error)?;
        let line_count = file.content.as_deref().map(|text| source_lines(text).len() as u64);
        Ok(Json(ReadFileResponse {
            path: file.path,
            is_text: file.is_text,
            size: file.size,
            line_count,
            content: file.content,
        }))
    }

    /// Get the lines the human selected in the viewer. With `wait`, block until a new selection
    /// is confirmed or `timeout` seconds pass. The selection is cleared after reading unless
    /// `consume` is false.
    #[tool(name = "get_selection")]
    async fn get_selection(
        &self,
        params: Parameters<GetSelectionParams>,
    ) -> Result<Json<GetSelectionResponse>, ErrorData> {
        let GetSelectionParams { wait, timeout, consume } = params.0;
        let request = RetrievalRequest::from_args(wait, timeout, consume);
        let retrieval = self.retriever.get(request).await.map_err(|err| {
            ErrorData::internal_error(format!("failed to update selection state: {err}"), None)
        })?;

        let response = match retrieval {
            Retrieval::Selected(selection) => GetSelectionResponse {
                status: SelectionStatus::Selected,
                message: format!("{} {}", selection.file_path, selection.range()),
                selection: Some(selection.into()),
            },
            Retrieval::Empty => GetSelectionResponse {
                status: SelectionStatus::None,
                selection: None,
                message: "No selection. Ask the human to select lines in the viewer and confirm."
                    .to_owned(),
            },
            Retrieval::TimedOut { waited } => GetSelectionResponse {
                status: SelectionStatus::TimedOut,
                selection: None,
                message: format!("No new selection within {:.1}s.", waited.as_secs_f64()),
            },
        };
        Ok(Json(response))
    }

    /// Clear the current selection (no-op when nothing is selected).
    #[tool(name = "clear_selection")]
    async fn clear_selection(&self) -> Result<Json<ClearSelectionResponse>, ErrorData> {
        let cleared = self.retriever.clear().map_err(|err| {
            ErrorData::internal_error(format!("failed to clear selection: {err}"), None)
        })?;
        Ok(Json(ClearSelectionResponse { cleared }))
    }

    /// Make the viewer show `path` and scroll to `line` (1-based).
    #[tool(name = "navigate_to_line")]
    async fn navigate_to_line(
        &self,
        params: Parameters<NavigateToLineParams>,
    ) -> Result<Json<NavigateResponse>, ErrorData> {
        let NavigateToLineParams { path, line } = params.0;
        let action = line_action(line).map_err(navigation_error)?;
        self.navigate(&path, action)
    }

    /// Make the viewer show `path` at the first line containing `text` (case-insensitive).
    #[tool(name = "navigate_to_text")]
    async fn navigate_to_text(
        &self,
        params: Parameters<NavigateToTextParams>,
    ) -> Result<Json<NavigateResponse>, ErrorData> {
        let NavigateToTextParams { path, text } = params.0;
        self.navigate(&path, NavigationAction::SearchText(text))
    }

    /// Make the viewer show `path` at the definition of function/class/type `name`.
    #[tool(name = "navigate_to_function")]
    async fn navigate_to_function(
        &self,
        params: Parameters<NavigateToFunctionParams>,
    ) -> Result<Json<NavigateResponse>, ErrorData> {
        let NavigateToFunctionParams { path, name } = params.0;
        self.navigate(&path, NavigationAction::FindFunction(name))
    }
}

// Prompts quote the selection without consuming it; `get_selection` still delivers it.
#[prompt_router]
impl ContextViewerMcp {
    /// Analyze a code or document selection from the viewer.
    #[prompt(name = "analyze-selection")]
    async fn analyze_selection(
        &self,
        Parameters(args): Parameters<AnalyzeSelectionArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        let Some(selection) = self.store.load().selection else {
            return Ok(no_selection_prompt());
        };
        let question = args
            .question
            .filter(|question| !question.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUESTION.to_owned());
        Ok(user_prompt(
            format!("Analyze selection from {}", selection.file_path),
            format!(
                "I've selected the following from {}:\n\n{question}",
                quoted_selection(&selection)
            ),
        ))
    }

    /// Refactor selected code with specific instructions.
    #[prompt(name = "refactor-selection")]
    async fn refactor_selection(
        &self,
        Parameters(args): Parameters<RefactorSelectionArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        let Some(selection) = self.store.load().selection else {
            return Ok(no_selection_prompt());
        };
        let instructions = args.instructions.trim();
        if instructions.is_empty() {
            return Ok(user_prompt(
                "Missing refactoring instructions",
                "Please provide refactoring instructions in the 'instructions' argument.",
            ));
        }
        Ok(user_prompt(
            format!("Refactor selection from {}", selection.file_path),
            format!(
                "Please refactor the following code from {}:\n\nInstructions: {instructions}\n\nProvide the refactored code and explain the changes.",
                quoted_selection(&selection)
            ),
        ))
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for ContextViewerMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Context Viewer: the human selects lines in a file viewer and you read them (tools: open_viewer, list_files, read_file, get_selection, clear_selection, navigate_to_line, navigate_to_text, navigate_to_function). Call open_viewer first, then get_selection with wait=true to receive the next confirmed selection. Prompts analyze-selection and refactor-selection quote the current selection; files are readable as file:///<path> resources."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        self.file_resource(&request.uri)
    }
}

// Error mapping and prompt builders shared by the handlers.
include!("server/helpers.rs");
