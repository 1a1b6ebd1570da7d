// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{NavigationCommand, NavigationTarget, Selection};
use crate::workspace::DirEntryInfo;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenViewerResponse {
    pub server_url: String,
    /// `true` when this call started a new viewer process.
    pub started: bool,
    pub server_pid: u32,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListFilesParams {
    /// Directory relative to the viewer root; defaults to the root.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesResponse {
    pub path: String,
    pub entries: Vec<DirEntryInfo>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    #[serde(alias = "file_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileResponse {
    pub path: String,
    pub is_text: bool,
    pub size: u64,
    pub line_count: Option<u64>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetSelectionParams {
    /// Block until the human confirms a new selection.
    #[serde(default)]
    pub wait: Option<bool>,
    /// Seconds to wait (default 60, max 3600). Only used with `wait`.
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Clear the selection after reading it (default true).
    #[serde(default)]
    pub consume: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    Selected,
    None,
    TimedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct McpSelection {
    pub file_path: String,
    pub start_line: u64,
    pub end_line: u64,
    pub line_count: u64,
    pub selected_text: String,
    pub timestamp: f64,
}

impl From<Selection> for McpSelection {
    fn from(selection: Selection) -> Self {
        Self {
            line_count: selection.line_count() as u64,
            file_path: selection.file_path,
            start_line: selection.start_line as u64,
            end_line: selection.end_line as u64,
            selected_text: selection.selected_text,
            timestamp: selection.timestamp.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetSelectionResponse {
    pub status: SelectionStatus,
    pub selection: Option<McpSelection>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearSelectionResponse {
    /// Whether a selection was present.
    pub cleared: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NavigateToLineParams {
    #[serde(alias = "file_path")]
    pub path: String,
    /// 1-based line number.
    pub line: i64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NavigateToTextParams {
    #[serde(alias = "file_path")]
    pub path: String,
    /// Case-insensitive text to look for; the first matching line wins.
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NavigateToFunctionParams {
    #[serde(alias = "file_path")]
    pub path: String,
    /// Function, class, or type name.
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AnalyzeSelectionArgs {
    /// What you want to know about the selection.
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RefactorSelectionArgs {
    /// How to refactor the selected code.
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum McpNavigationTarget {
    Line(u64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NavigateResponse {
    pub command: String,
    pub file_path: String,
    pub target: McpNavigationTarget,
    pub timestamp: f64,
    /// Address of a running viewer, if one is known.
    pub viewer_url: Option<String>,
}

impl NavigateResponse {
    pub fn new(command: NavigationCommand, viewer_url: Option<String>) -> Self {
        let target = match command.target {
            NavigationTarget::Line(line) => McpNavigationTarget::Line(line),
            NavigationTarget::Text(text) => McpNavigationTarget::Text(text),
        };
        Self {
            command: command.command.as_str().to_owned(),
            file_path: command.file_path,
            target,
            timestamp: command.timestamp.as_secs(),
            viewer_url,
        }
    }
}
