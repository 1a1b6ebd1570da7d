// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turning viewer gestures into a committed line selection.
//!
//! A [`LineSelector`] accumulates a working set of 1-based line numbers from clicks, drags, and
//! the paragraph/indent-block shortcuts. Committing flattens the set to `min..=max` and rebuilds
//! the text from the file's lines, so unclicked lines inside the span are part of the commit.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::{LineRange, SelectionCommit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    EmptySelection,
    InvalidRange { start_line: usize, end_line: usize },
    LineOutOfRange { line: usize, line_count: usize },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySelection => f.write_str("no lines selected"),
            Self::InvalidRange { start_line, end_line } => {
                write!(f, "invalid line range {start_line}..{end_line}")
            }
            Self::LineOutOfRange { line, line_count } => {
                write!(f, "line {line} is beyond the end of the file ({line_count} lines)")
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// Splits file text into its lines.
///
/// Lines are the `\n`-separated segments; the empty segment after a trailing newline is not a
/// line. Carriage returns stay attached so rebuilt text matches the source byte for byte.
pub fn source_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

/// Count of leading whitespace characters.
pub fn indent_width(line: &str) -> usize {
    line.chars().take_while(|ch| ch.is_whitespace()).count()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Checks a 1-based inclusive range against a file of `line_count` lines.
pub fn check_range(start_line: usize, end_line: usize, line_count: usize) -> Result<LineRange, CaptureError> {
    if start_line == 0 || start_line > end_line {
        return Err(CaptureError::InvalidRange { start_line, end_line });
    }
    if end_line > line_count {
        return Err(CaptureError::LineOutOfRange { line: end_line, line_count });
    }
    Ok(LineRange { start: start_line, end: end_line })
}

/// The verbatim source lines of `range`, joined by `\n`.
pub fn range_text(lines: &[&str], range: LineRange) -> String {
    lines[range.start - 1..range.end].join("\n")
}

/// Maximal run of non-blank lines around `line`. A blank line selects only itself.
pub fn paragraph_range(lines: &[&str], line: usize) -> Option<LineRange> {
    let idx = line.checked_sub(1).filter(|idx| *idx < lines.len())?;
    if is_blank(lines[idx]) {
        return Some(LineRange::single(line));
    }

    let mut start = idx;
    while start > 0 && !is_blank(lines[start - 1]) {
        start -= 1;
    }
    let mut end = idx;
    while end + 1 < lines.len() && !is_blank(lines[end + 1]) {
        end += 1;
    }
    Some(LineRange { start: start + 1, end: end + 1 })
}

/// Block of lines indented at least as deep as `line`, plus the header line that opens it.
///
/// Blank lines are transparent while expanding. Upward, the first non-blank line with smaller
/// indentation is the block header: it is included and expansion stops. Downward, expansion stops
/// before the first non-blank line with smaller indentation. Blank lines left at either edge are
/// trimmed. A blank line selects only itself.
pub fn indent_block_range(lines: &[&str], line: usize) -> Option<LineRange> {
    let idx = line.checked_sub(1).filter(|idx| *idx < lines.len())?;
    if is_blank(lines[idx]) {
        return Some(LineRange::single(line));
    }
    let width = indent_width(lines[idx]);

    let mut start = idx;
    while start > 0 {
        let above = lines[start - 1];
        start -= 1;
        if !is_blank(above) && indent_width(above) < width {
            break;
        }
    }

    let mut end = idx;
    while end + 1 < lines.len() {
        let below = lines[end + 1];
        if !is_blank(below) && indent_width(below) < width {
            break;
        }
        end += 1;
    }

    while start < idx && is_blank(lines[start]) {
        start += 1;
    }
    while end > idx && is_blank(lines[end]) {
        end -= 1;
    }
    Some(LineRange { start: start + 1, end: end + 1 })
}

/// Working set of selected lines for one displayed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSelector {
    lines: BTreeSet<usize>,
    anchor: Option<usize>,
    drag_origin: Option<usize>,
}

impl LineSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, line: usize) -> bool {
        self.lines.contains(&line)
    }

    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines.iter().copied()
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// The span a commit would cover: `min..=max` of the working set.
    pub fn span(&self) -> Option<LineRange> {
        let first = *self.lines.first()?;
        let last = *self.lines.last()?;
        Some(LineRange { start: first, end: last })
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.anchor = None;
        self.drag_origin = None;
    }

    /// Plain click. Without the toggle modifier the set becomes `{line}`; with it, `line` flips.
    pub fn click(&mut self, line: usize, toggle: bool) {
        if toggle {
            if !self.lines.remove(&line) {
                self.lines.insert(line);
            }
        } else {
            self.lines.clear();
            self.lines.insert(line);
        }
        self.anchor = Some(line);
    }

    /// Shift-click: the closed range between the anchor and `line`. The anchor is kept.
    pub fn shift_click(&mut self, line: usize) {
        let anchor = *self.anchor.get_or_insert(line);
        self.replace_with(LineRange::spanning(anchor, line));
    }

    pub fn press(&mut self, line: usize) {
        self.drag_origin = Some(line);
        self.anchor = Some(line);
        self.replace_with(LineRange::single(line));
    }

    /// Pointer moved over `line` while pressed. Only the origin and current line matter.
    pub fn drag_to(&mut self, line: usize) {
        if let Some(origin) = self.drag_origin {
            self.replace_with(LineRange::spanning(origin, line));
        }
    }

    pub fn release(&mut self) {
        self.drag_origin = None;
    }

    pub fn double_click(&mut self, lines: &[&str], line: usize) {
        if let Some(range) = paragraph_range(lines, line) {
            self.anchor = Some(line);
            self.replace_with(range);
        }
    }

    pub fn alt_click(&mut self, lines: &[&str], line: usize) {
        if let Some(range) = indent_block_range(lines, line) {
            self.anchor = Some(line);
            self.replace_with(range);
        }
    }

    pub fn replace_with(&mut self, range: LineRange) {
        self.lines.clear();
        self.lines.extend(range.lines());
    }

    /// Flattens the working set against the file's current lines.
    pub fn commit(&self, lines: &[&str], file_path: &str) -> Result<SelectionCommit, CaptureError> {
        let span = self.span().ok_or(CaptureError::EmptySelection)?;
        let range = check_range(span.start, span.end, lines.len())?;
        Ok(SelectionCommit {
            file_path: file_path.to_owned(),
            start_line: range.start,
            end_line: range.end,
            selected_text: range_text(lines, range),
        })
    }
}
