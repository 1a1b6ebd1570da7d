// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use context_viewer::model::{NavigationAction, NavigationCommand, Selection, SharedState, Timestamp};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("context_viewer_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    /// A few lines selected, one pending command.
    Small,
    /// A whole large file selected.
    Large,
}

fn source_text(lines: usize) -> String {
    (1..=lines)
        .map(|n| format!("    let value_{n} = compute({n}, \"payload\"); // line {n}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn state(case: Case) -> SharedState {
    let line_count = match case {
        Case::Small => 5,
        Case::Large => 5_000,
    };
    SharedState {
        server_url: Some("http://127.0.0.1:8765".to_owned()),
        server_pid: Some(4242),
        selection: Some(Selection {
            file_path: "src/engine/compute.rs".to_owned(),
            start_line: 1,
            end_line: line_count,
            selected_text: source_text(line_count),
            timestamp: Timestamp::from_secs(1_700_000_000.25),
        }),
        navigation: Some(NavigationCommand::new(
            &NavigationAction::FindFunction("compute".to_owned()),
            "src/engine/compute.rs",
        )),
    }
}
