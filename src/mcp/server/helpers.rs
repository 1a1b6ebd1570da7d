// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

fn workspace_error(err: WorkspaceError) -> ErrorData {
    match err {
        WorkspaceError::OutsideRoot { .. }
        | WorkspaceError::NotADirectory { .. }
        | WorkspaceError::NotAFile { .. } => ErrorData::invalid_params(err.to_string(), None),
        WorkspaceError::NotFound { ref path } => ErrorData::resource_not_found(
            err.to_string(),
            Some(serde_json::json!({ "path": path })),
        ),
        WorkspaceError::Io { .. } => ErrorData::internal_error(err.to_string(), None),
    }
}

fn navigation_error(err: NavigationError) -> ErrorData {
    match err {
        NavigationError::Store(_) => ErrorData::internal_error(err.to_string(), None),
        NavigationError::EmptyFilePath
        | NavigationError::InvalidLine { .. }
        | NavigationError::EmptyTarget => ErrorData::invalid_params(err.to_string(), None),
    }
}

fn user_prompt(description: impl Into<String>, text: impl Into<String>) -> GetPromptResult {
    GetPromptResult {
        description: Some(description.into()),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text.into())],
    }
}

fn no_selection_prompt() -> GetPromptResult {
    user_prompt(
        "No selection available",
        "Please open the viewer (use the 'open_viewer' tool) and select some lines first.",
    )
}

/// `<file> (lines a-b)` followed by the selected text in a code fence.
fn quoted_selection(selection: &Selection) -> String {
    format!(
        "{} (lines {}-{}):\n\n```\n{}\n```",
        selection.file_path, selection.start_line, selection.end_line, selection.selected_text
    )
}
