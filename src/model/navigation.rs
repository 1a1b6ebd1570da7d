// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    GotoLine,
    SearchText,
    FindFunction,
}

impl NavigationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GotoLine => "goto_line",
            Self::SearchText => "search_text",
            Self::FindFunction => "find_function",
        }
    }
}

impl fmt::Display for NavigationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw command payload as persisted: a line number or a text fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NavigationTarget {
    Line(u64),
    Text(String),
}

/// A command payload that has been checked against its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    GotoLine(usize),
    SearchText(String),
    FindFunction(String),
}

impl NavigationAction {
    pub fn kind(&self) -> NavigationKind {
        match self {
            Self::GotoLine(_) => NavigationKind::GotoLine,
            Self::SearchText(_) => NavigationKind::SearchText,
            Self::FindFunction(_) => NavigationKind::FindFunction,
        }
    }

    pub fn target(&self) -> NavigationTarget {
        match self {
            Self::GotoLine(line) => NavigationTarget::Line(*line as u64),
            Self::SearchText(text) | Self::FindFunction(text) => NavigationTarget::Text(text.clone()),
        }
    }
}

impl fmt::Display for NavigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GotoLine(line) => write!(f, "go to line {line}"),
            Self::SearchText(text) => write!(f, "search for {text:?}"),
            Self::FindFunction(name) => write!(f, "find definition of {name:?}"),
        }
    }
}

/// One-shot instruction from the assistant side to the viewer.
///
/// `executed` only ever flips from `false` to `true` for a given `timestamp`; a newer command
/// replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationCommand {
    pub command: NavigationKind,
    pub file_path: String,
    pub target: NavigationTarget,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub executed: bool,
}

impl NavigationCommand {
    pub fn new(action: &NavigationAction, file_path: impl Into<String>) -> Self {
        Self {
            command: action.kind(),
            file_path: file_path.into(),
            target: action.target(),
            timestamp: Timestamp::now(),
            executed: false,
        }
    }

    /// Returns the typed action, or `None` when the payload does not fit the command kind.
    pub fn action(&self) -> Option<NavigationAction> {
        match (self.command, &self.target) {
            (NavigationKind::GotoLine, NavigationTarget::Line(line)) => {
                usize::try_from(*line).ok().map(NavigationAction::GotoLine)
            }
            (NavigationKind::GotoLine, NavigationTarget::Text(raw)) => {
                raw.trim().parse::<usize>().ok().map(NavigationAction::GotoLine)
            }
            (NavigationKind::SearchText, NavigationTarget::Text(text)) => {
                Some(NavigationAction::SearchText(text.clone()))
            }
            (NavigationKind::FindFunction, NavigationTarget::Text(name)) => {
                Some(NavigationAction::FindFunction(name.clone()))
            }
            (NavigationKind::SearchText | NavigationKind::FindFunction, NavigationTarget::Line(_)) => {
                None
            }
        }
    }
}
