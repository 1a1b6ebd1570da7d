// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! One-shot navigation commands from the assistant to the viewer.
//!
//! The producer writes a single pending command into the state store. The viewer runs a
//! [`NavigationAgent`] on a timer: each poll picks up a command only if it is unexecuted and newer
//! than the last one the agent looked at, resolves its destination line, reveals it, and marks it
//! executed. Unresolvable commands are dropped without a retry and stay unexecuted in the store.

use std::fmt;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::model::{NavigationAction, NavigationCommand, Timestamp};
use crate::store::{StateStore, StoreError};
use crate::workspace::WorkspaceError;

/// How often the viewer checks for a new command.
pub const NAVIGATION_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum NavigationError {
    EmptyFilePath,
    InvalidLine { line: i64 },
    EmptyTarget,
    Store(StoreError),
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFilePath => f.write_str("file path must not be empty"),
            Self::InvalidLine { line } => write!(f, "line must be >= 1 (got {line})"),
            Self::EmptyTarget => f.write_str("navigation target must not be empty"),
            Self::Store(err) => write!(f, "cannot write navigation command: {err}"),
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NavigationError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Checks a raw line argument from a tool call.
pub fn line_action(line: i64) -> Result<NavigationAction, NavigationError> {
    match usize::try_from(line) {
        Ok(line) if line >= 1 => Ok(NavigationAction::GotoLine(line)),
        _ => Err(NavigationError::InvalidLine { line }),
    }
}

/// Writes a fresh pending command, replacing whatever was pending before.
pub fn issue(
    store: &StateStore,
    action: &NavigationAction,
    file_path: &str,
) -> Result<NavigationCommand, NavigationError> {
    if file_path.trim().is_empty() {
        return Err(NavigationError::EmptyFilePath);
    }
    match action {
        NavigationAction::GotoLine(0) => return Err(NavigationError::InvalidLine { line: 0 }),
        NavigationAction::SearchText(text) | NavigationAction::FindFunction(text)
            if text.trim().is_empty() =>
        {
            return Err(NavigationError::EmptyTarget)
        }
        _ => {}
    }

    let command = store.issue_navigation(action, file_path)?;
    info!(
        command = %command.command,
        file = %command.file_path,
        timestamp = %command.timestamp,
        "navigation issued"
    );
    Ok(command)
}

/// Regex matching a definition of `name` in the common syntactic shapes.
///
/// Covers Python (`def`, `async def`, `class`), Rust items, JavaScript/TypeScript functions,
/// classes, and function-valued bindings, Go `func` with or without a receiver, and Ruby/shell
/// style `def`/`function` definitions.
pub fn definition_pattern(name: &str) -> Option<Regex> {
    let name = regex::escape(name.trim());
    if name.is_empty() {
        return None;
    }
    let shapes = [
        // Python, Ruby
        format!(r"^\s*(?:async\s+)?def\s+(?:self\.)?{name}\b"),
        format!(r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+{name}\b"),
        // Rust
        format!(
            r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:(?:const|async|unsafe|extern(?:\s+"[^"]*")?)\s+)*fn\s+{name}\b"#
        ),
        format!(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|mod|type|union)\s+{name}\b"),
        format!(r"^\s*impl(?:<[^>]*>)?\s+(?:[\w:]+(?:<[^>]*>)?\s+for\s+)?{name}\b"),
        // JavaScript / TypeScript, shell `function name`
        format!(r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*{name}\b"),
        format!(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+{name}\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[\w$]+\s*=>)"
        ),
        // Go
        format!(r"^\s*func\s+(?:\([^)]*\)\s*)?{name}\s*[(\[]"),
        // POSIX shell `name() {` or `name() (`; a bare `name()` is a call
        format!(r"^\s*{name}\s*\(\)\s*[{{(]"),
    ];
    let alternation = shapes
        .iter()
        .map(|shape| format!("(?:{shape})"))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&alternation) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(error = %err, "cannot build definition pattern");
            None
        }
    }
}

/// The 1-based line a command should land on, or `None` when its target is not in `lines`.
///
/// `goto_line` targets are returned as given; the viewer clamps them to the file.
pub fn resolve_destination(lines: &[&str], action: &NavigationAction) -> Option<usize> {
    match action {
        NavigationAction::GotoLine(line) => Some(*line),
        NavigationAction::SearchText(text) => {
            if text.is_empty() {
                return None;
            }
            let needle = RegexBuilder::new(&regex::escape(text))
                .case_insensitive(true)
                .build()
                .ok()?;
            lines.iter().position(|line| needle.is_match(line)).map(|idx| idx + 1)
        }
        NavigationAction::FindFunction(name) => {
            let pattern = definition_pattern(name)?;
            lines.iter().position(|line| pattern.is_match(line)).map(|idx| idx + 1)
        }
    }
}

/// What the agent needs from the component displaying files.
pub trait NavigationViewer {
    /// Root-relative path of the displayed file, if any.
    fn current_file(&self) -> Option<&str>;

    /// Loads and displays `file_path`. Content must be available when this returns.
    fn open_file(&mut self, file_path: &str) -> Result<(), WorkspaceError>;

    fn current_lines(&self) -> Vec<&str>;

    /// Scrolls to and emphasizes `line`, clamped to the displayed file.
    fn reveal_line(&mut self, line: usize);
}

#[derive(Debug)]
pub enum NavigationOutcome {
    /// Nothing pending, or the pending command was already executed or seen.
    Idle,
    Executed { command: NavigationCommand, line: usize },
    TargetNotFound { command: NavigationCommand },
    FileUnavailable { command: NavigationCommand, error: WorkspaceError },
    /// The payload does not fit the command kind.
    Malformed { command: NavigationCommand },
}

/// Viewer-side consumer of navigation commands.
#[derive(Debug, Default)]
pub struct NavigationAgent {
    last_seen: Option<Timestamp>,
}

impl NavigationAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<Timestamp> {
        self.last_seen
    }

    /// Runs one poll cycle against the store.
    pub fn poll(
        &mut self,
        store: &StateStore,
        viewer: &mut impl NavigationViewer,
    ) -> Result<NavigationOutcome, StoreError> {
        let Some(command) = store.load().navigation else {
            return Ok(NavigationOutcome::Idle);
        };
        if command.executed || !command.timestamp.is_newer_than(self.last_seen) {
            return Ok(NavigationOutcome::Idle);
        }
        self.last_seen = Some(command.timestamp);

        let Some(action) = command.action() else {
            warn!(command = %command.command, "navigation payload does not match its kind");
            return Ok(NavigationOutcome::Malformed { command });
        };

        if viewer.current_file() != Some(command.file_path.as_str()) {
            if let Err(error) = viewer.open_file(&command.file_path) {
                warn!(file = %command.file_path, error = %error, "navigation target file unavailable");
                return Ok(NavigationOutcome::FileUnavailable { command, error });
            }
        }

        let Some(line) = resolve_destination(&viewer.current_lines(), &action) else {
            debug!(file = %command.file_path, action = %action, "navigation target not found");
            return Ok(NavigationOutcome::TargetNotFound { command });
        };

        viewer.reveal_line(line);
        store.mark_navigation_executed(command.timestamp)?;
        info!(file = %command.file_path, action = %action, line, "navigation executed");
        Ok(NavigationOutcome::Executed { command, line })
    }
}

#[cfg(test)]
mod tests;
