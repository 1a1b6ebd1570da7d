// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use context_viewer::capture::{source_lines, LineSelector};
use context_viewer::model::{NavigationAction, SelectionCommit};
use context_viewer::navigation::{self, NavigationAgent, NavigationOutcome, NavigationViewer};
use context_viewer::retrieval::{Retrieval, RetrievalRequest, SelectionRetriever};
use context_viewer::store::StateStore;
use context_viewer::web::{router, AppState};
use context_viewer::workspace::{Workspace, WorkspaceError};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const SOURCE: &str = "\
import os

def load(path):
    with open(path) as handle:
        return handle.read()

def save(path, text):
    with open(path, \"w\") as handle:
        handle.write(text)
";

struct Scratch {
    path: PathBuf,
}

impl Scratch {
    fn new(name: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "context-viewer-it-{name}-{}-{nanos}",
            std::process::id()
        ));
        std::fs::create_dir_all(path.join("root")).unwrap();
        std::fs::write(path.join("root/io.py"), SOURCE).unwrap();
        Self { path }
    }

    fn root(&self) -> PathBuf {
        self.path.join("root")
    }

    fn state_file(&self) -> PathBuf {
        self.path.join("state.json")
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Minimal stand-in for a viewer process: one file, a cursor.
struct FileViewer {
    workspace: Workspace,
    path: Option<String>,
    text: String,
    revealed: Option<usize>,
}

impl FileViewer {
    fn new(root: &Path) -> Self {
        Self {
            workspace: Workspace::open(root).unwrap(),
            path: None,
            text: String::new(),
            revealed: None,
        }
    }
}

impl NavigationViewer for FileViewer {
    fn current_file(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn open_file(&mut self, file_path: &str) -> Result<(), WorkspaceError> {
        let content = self.workspace.read_file(file_path)?;
        self.text = content.content.unwrap_or_default();
        self.path = Some(content.path);
        Ok(())
    }

    fn current_lines(&self) -> Vec<&str> {
        source_lines(&self.text)
    }

    fn reveal_line(&mut self, line: usize) {
        self.revealed = Some(line);
    }
}

async fn post_json(state: &AppState, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn selection_committed_over_http_is_delivered_once() {
    let scratch = Scratch::new("http-selection");
    let viewer_store = Arc::new(StateStore::new(scratch.state_file()));
    let state = AppState {
        store: Arc::clone(&viewer_store),
        workspace: Arc::new(Workspace::open(scratch.root()).unwrap()),
        server_url: None,
    };

    let lines = source_lines(SOURCE);
    let mut selector = LineSelector::new();
    selector.double_click(&lines, 4);
    let commit = selector.commit(&lines, "io.py").unwrap();
    assert_eq!((commit.start_line, commit.end_line), (3, 5));

    let (status, _) = post_json(
        &state,
        "/api/confirm-selection",
        serde_json::to_value(&commit).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The tool side uses its own store handle on the same file.
    let tool_store = Arc::new(StateStore::new(scratch.state_file()));
    let retriever = SelectionRetriever::new(tool_store);

    let first = retriever.get(RetrievalRequest::default()).await.unwrap();
    let selection = first.selection().expect("selection delivered");
    assert_eq!(selection.file_path, "io.py");
    assert_eq!(
        selection.selected_text,
        "def load(path):\n    with open(path) as handle:\n        return handle.read()"
    );

    let second = retriever.get(RetrievalRequest::default()).await.unwrap();
    assert!(matches!(second, Retrieval::Empty));
}

#[tokio::test]
async fn waiting_retrieval_sees_a_selection_made_meanwhile() {
    let scratch = Scratch::new("wait");
    let store = Arc::new(StateStore::new(scratch.state_file()));
    let retriever =
        SelectionRetriever::new(Arc::clone(&store)).with_poll_interval(Duration::from_millis(20));

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            store
                .record_selection(SelectionCommit {
                    file_path: "io.py".to_owned(),
                    start_line: 1,
                    end_line: 1,
                    selected_text: "import os".to_owned(),
                })
                .unwrap();
        })
    };

    let outcome = retriever
        .get(RetrievalRequest {
            wait: true,
            timeout: Duration::from_secs(5),
            consume: true,
        })
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(
        outcome.selection().map(|selection| selection.selected_text.as_str()),
        Some("import os")
    );
    assert!(store.load().selection.is_none());
}

#[tokio::test]
async fn navigation_command_reaches_viewer_exactly_once() {
    let scratch = Scratch::new("navigation");
    let tool_store = StateStore::new(scratch.state_file());
    let viewer_store = StateStore::new(scratch.state_file());
    let mut viewer = FileViewer::new(&scratch.root());
    let mut agent = NavigationAgent::new();

    let command = navigation::issue(
        &tool_store,
        &NavigationAction::FindFunction("save".to_owned()),
        "io.py",
    )
    .unwrap();

    let outcome = agent.poll(&viewer_store, &mut viewer).unwrap();
    assert!(matches!(outcome, NavigationOutcome::Executed { line: 7, .. }));
    assert_eq!(viewer.current_file(), Some("io.py"));
    assert_eq!(viewer.revealed, Some(7));

    let stored = tool_store.load().navigation.expect("navigation kept");
    assert_eq!(stored.timestamp, command.timestamp);
    assert!(stored.executed);

    viewer.revealed = None;
    let again = agent.poll(&viewer_store, &mut viewer).unwrap();
    assert!(matches!(again, NavigationOutcome::Idle));
    assert_eq!(viewer.revealed, None);
}

#[tokio::test]
async fn navigation_executed_endpoint_ignores_superseded_commands() {
    let scratch = Scratch::new("executed");
    let store = Arc::new(StateStore::new(scratch.state_file()));
    let state = AppState {
        store: Arc::clone(&store),
        workspace: Arc::new(Workspace::open(scratch.root()).unwrap()),
        server_url: None,
    };

    let old = navigation::issue(&store, &NavigationAction::GotoLine(3), "io.py").unwrap();
    let new = navigation::issue(&store, &NavigationAction::GotoLine(7), "io.py").unwrap();

    let (status, body) = post_json(
        &state,
        "/api/navigation-executed",
        json!({ "timestamp": old.timestamp }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executed"], false);
    assert!(!store.load().navigation.unwrap().executed);

    let (_, body) = post_json(
        &state,
        "/api/navigation-executed",
        json!({ "timestamp": new.timestamp }),
    )
    .await;
    assert_eq!(body["executed"], true);
    assert!(store.load().navigation.unwrap().executed);
}

#[test]
fn viewer_shutdown_leaves_an_empty_document() {
    let scratch = Scratch::new("shutdown");
    let store = StateStore::new(scratch.state_file());
    store.reset("http://127.0.0.1:8765", std::process::id()).unwrap();
    assert_eq!(
        store.load().server_url.as_deref(),
        Some("http://127.0.0.1:8765")
    );

    store.reset_empty().unwrap();
    assert_eq!(std::fs::read_to_string(scratch.state_file()).unwrap(), "{}\n");
    assert!(store.load().is_empty());
}
