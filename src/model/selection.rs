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

/// A committed, contiguous line range from one file.
///
/// `start_line`/`end_line` are 1-based and inclusive. `selected_text` is the verbatim source
/// lines of that range joined by `\n` (no trailing newline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub selected_text: String,
    pub timestamp: Timestamp,
}

impl Selection {
    /// Stamps a commit with its capture time.
    pub fn from_commit(commit: SelectionCommit, timestamp: Timestamp) -> Self {
        Self {
            file_path: commit.file_path,
            start_line: commit.start_line,
            end_line: commit.end_line,
            selected_text: commit.selected_text,
            timestamp,
        }
    }

    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn range(&self) -> LineRange {
        LineRange {
            start: self.start_line,
            end: self.end_line,
        }
    }
}

/// A selection as submitted by a viewer, before the store stamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCommit {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub selected_text: String,
}

impl SelectionCommit {
    pub fn range(&self) -> LineRange {
        LineRange::spanning(self.start_line, self.end_line)
    }
}

/// Inclusive 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Builds the closed range between two lines regardless of their order.
    pub fn spanning(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn lines(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "L{}", self.start)
        } else {
            write!(f, "L{}-{}", self.start, self.end)
        }
    }
}
