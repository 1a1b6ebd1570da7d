// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface of the viewer process.
//!
//! Besides the file API, three endpoints carry the synchronization protocol for any external
//! (browser) viewer: committing a selection, reading the shared state for the navigation poll,
//! and acknowledging an executed navigation command. MCP over streamable HTTP is nested at `/mcp`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::capture::{check_range, CaptureError};
use crate::mcp::ContextViewerMcp;
use crate::model::{SelectionCommit, SharedState, Timestamp};
use crate::store::{StateStore, StoreError};
use crate::workspace::{DirEntryInfo, FileContent, Workspace, WorkspaceError};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<StateStore>,
    pub workspace: Arc<Workspace>,
    pub server_url: Option<String>,
}

#[derive(Debug)]
pub enum WebError {
    BadRequest(String),
    Workspace(WorkspaceError),
    Store(StoreError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(message) => f.write_str(message),
            Self::Workspace(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<WorkspaceError> for WebError {
    fn from(err: WorkspaceError) -> Self {
        Self::Workspace(err)
    }
}

impl From<StoreError> for WebError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<CaptureError> for WebError {
    fn from(err: CaptureError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl WebError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Workspace(WorkspaceError::OutsideRoot { .. }) => {
                (StatusCode::FORBIDDEN, "forbidden")
            }
            Self::Workspace(WorkspaceError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Workspace(WorkspaceError::NotADirectory { .. } | WorkspaceError::NotAFile { .. }) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            Self::Workspace(WorkspaceError::Io { .. }) | Self::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (
            status,
            Json(serde_json::json!({
                "error": code,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfoResponse {
    pub name: String,
    pub version: String,
    pub root: String,
    pub server_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmSelectionResponse {
    pub status: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationExecutedRequest {
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationExecutedResponse {
    pub status: String,
    pub executed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(server_info))
        .route("/api/confirm-selection", post(confirm_selection))
        .route("/api/navigation-state", get(navigation_state))
        .route("/api/navigation-executed", post(navigation_executed))
        .route("/api/files", get(list_files))
        .route("/api/file-content", get(file_content))
        .with_state(state)
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: env!("CARGO_PKG_NAME").to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        root: state.workspace.root().display().to_string(),
        server_url: state.server_url.clone(),
    })
}

async fn confirm_selection(
    State(state): State<AppState>,
    Json(commit): Json<SelectionCommit>,
) -> Result<Json<ConfirmSelectionResponse>, WebError> {
    // Line counts are checked by the viewer that built the commit.
    check_range(commit.start_line, commit.end_line, usize::MAX)?;
    let path = state.workspace.resolve(&commit.file_path)?;
    if !path.is_file() {
        return Err(WorkspaceError::NotFound {
            path: commit.file_path,
        }
        .into());
    }

    let selection = state.store.record_selection(commit)?;
    info!(
        file = %selection.file_path,
        range = %selection.range(),
        lines = selection.line_count(),
        "selection confirmed"
    );
    Ok(Json(ConfirmSelectionResponse {
        status: "ok".to_owned(),
        timestamp: selection.timestamp,
    }))
}

async fn navigation_state(State(state): State<AppState>) -> Json<SharedState> {
    Json(state.store.load())
}

async fn navigation_executed(
    State(state): State<AppState>,
    Json(request): Json<NavigationExecutedRequest>,
) -> Result<Json<NavigationExecutedResponse>, WebError> {
    let executed = state.store.mark_navigation_executed(request.timestamp)?;
    if executed {
        info!(timestamp = %request.timestamp, "navigation acknowledged");
    }
    Ok(Json(NavigationExecutedResponse {
        status: "ok".to_owned(),
        executed,
    }))
}

async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<Vec<DirEntryInfo>>, WebError> {
    let path = query.path.unwrap_or_default();
    Ok(Json(state.workspace.list_dir(&path)?))
}

async fn file_content(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<FileContent>, WebError> {
    let Some(path) = query.path.filter(|path| !path.trim().is_empty()) else {
        return Err(WebError::BadRequest("missing `path` query parameter".to_owned()));
    };
    Ok(Json(state.workspace.read_file(&path)?))
}

/// Serves the HTTP surface plus MCP at `/mcp` on `listener` until `until` completes.
///
/// Shutdown is graceful: in-flight requests finish before this returns `until`'s output.
pub async fn serve_until<T>(
    listener: TcpListener,
    state: AppState,
    mcp: ContextViewerMcp,
    until: impl Future<Output = T>,
) -> T {
    let config = StreamableHttpServerConfig {
        stateful_mode: true,
        ..StreamableHttpServerConfig::default()
    };
    let shutdown_token = config.cancellation_token.clone();
    let server_shutdown = shutdown_token.clone();

    let session_manager = Arc::new(LocalSessionManager::default());
    let mcp_service = StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, config);

    let app = router(state).nest_service("/mcp", mcp_service);
    let server_handle = tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
        });
        if let Err(err) = serve.await {
            error!(error = %err, "HTTP server error");
        }
    });

    let output = until.await;
    shutdown_token.cancel();
    let _ = server_handle.await;
    output
}
