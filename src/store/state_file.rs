// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::model::{
    NavigationAction, NavigationCommand, Selection, SelectionCommit, SharedState, Timestamp,
};

pub const DEFAULT_STATE_FILENAME: &str = ".context-viewer-state.json";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush the written document and the rename to stable storage where possible.
    Durable,
}

/// File-backed holder of [`SharedState`], shared by independent processes.
///
/// Readers never observe a partially written document: every write goes to a temp sibling and is
/// renamed over the state file. Reads are tolerant and degrade to an empty state. Read-modify-write
/// helpers are serialized within this process; across processes the last writer wins.
///
/// All methods do blocking file I/O. Async callers on a multi-threaded runtime that issue many
/// requests at once should wrap them in `tokio::task::spawn_blocking`; the document is small, so
/// the current-thread servers here call them inline.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    durability: WriteDurability,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            durability: WriteDurability::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the per-user default location (`~/.context-viewer-state.json`).
    pub fn at_default_location() -> Option<Self> {
        default_state_path().map(Self::new)
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unparseable state document is moved before starting over.
    pub fn backup_path(&self) -> PathBuf {
        sibling_with_suffix(&self.path, ".backup")
    }

    /// Reads the current document, treating a missing, unreadable, or corrupt file as empty.
    pub fn load(&self) -> SharedState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return SharedState::default(),
            Err(err) => {
                warn!(path = ?self.path, error = %err, "cannot read state file; treating as empty");
                return SharedState::default();
            }
        };

        let value = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = ?self.path, error = %err, "corrupt state file; resetting");
                self.back_up_corrupt_file();
                return SharedState::default();
            }
        };

        match SharedState::from_value_lenient(value) {
            Some((state, dropped)) => {
                if !dropped.is_empty() {
                    warn!(path = ?self.path, fields = ?dropped.fields, "dropped invalid state fields");
                }
                state
            }
            None => {
                warn!(path = ?self.path, "state file is not a JSON object; treating as empty");
                SharedState::default()
            }
        }
    }

    /// Replaces the whole document atomically.
    pub fn save(&self, state: &SharedState) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(state).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, format!("{body}\n").as_bytes(), self.durability)?;
        debug!(path = ?self.path, bytes = body.len() + 1, "state saved");
        Ok(())
    }

    /// Loads, applies `mutate`, and saves when `mutate` reports a change.
    ///
    /// Returns the value produced by `mutate` alongside whether anything was written.
    pub fn update<R>(
        &self,
        mutate: impl FnOnce(&mut SharedState) -> (R, bool),
    ) -> Result<R, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut state = self.load();
        let (result, changed) = mutate(&mut state);
        if changed {
            self.save(&state)?;
        }
        Ok(result)
    }

    /// Removes the selection. Returns whether there was one; calling it again is a no-op.
    pub fn clear_selection(&self) -> Result<bool, StoreError> {
        self.update(|state| {
            let had_selection = state.selection.take().is_some();
            (had_selection, had_selection)
        })
    }

    /// Removes the selection only if it is still the one captured at `timestamp`.
    ///
    /// A selection captured after the caller read the store is left in place.
    pub fn consume_selection(&self, timestamp: Timestamp) -> Result<bool, StoreError> {
        self.update(|state| {
            let matches = state
                .selection
                .as_ref()
                .is_some_and(|selection| selection.timestamp == timestamp);
            if matches {
                state.selection = None;
            }
            (matches, matches)
        })
    }

    /// Stamps and stores a new selection, replacing any previous one.
    pub fn record_selection(&self, commit: SelectionCommit) -> Result<Selection, StoreError> {
        self.update(|state| {
            let selection = Selection::from_commit(commit, Timestamp::now());
            state.selection = Some(selection.clone());
            (selection, true)
        })
    }

    /// Writes a fresh pending navigation command, replacing any previous one.
    pub fn issue_navigation(
        &self,
        action: &NavigationAction,
        file_path: &str,
    ) -> Result<NavigationCommand, StoreError> {
        self.update(|state| {
            let command = NavigationCommand::new(action, file_path);
            state.navigation = Some(command.clone());
            (command, true)
        })
    }

    /// Flags the pending command as executed if it still carries `timestamp`.
    ///
    /// Returns `false` (not an error) when the command was superseded or is gone.
    pub fn mark_navigation_executed(&self, timestamp: Timestamp) -> Result<bool, StoreError> {
        self.update(|state| match state.navigation.as_mut() {
            Some(navigation) if navigation.timestamp == timestamp => {
                let changed = !navigation.executed;
                navigation.executed = true;
                (true, changed)
            }
            _ => (false, false),
        })
    }

    /// Starts a fresh document advertising a running viewer.
    pub fn reset(&self, server_url: impl Into<String>, server_pid: u32) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.save(&SharedState {
            server_url: Some(server_url.into()),
            server_pid: Some(server_pid),
            ..SharedState::default()
        })
    }

    /// Resets the document to `{}`.
    pub fn reset_empty(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.save(&SharedState::default())
    }

    fn back_up_corrupt_file(&self) {
        let backup = self.backup_path();
        match rename_overwrite(&self.path, &backup) {
            Ok(()) => warn!(backup = ?backup, "backed up corrupt state file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(backup = ?backup, error = %err, "cannot back up corrupt state file"),
        }
    }
}

pub fn default_state_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_STATE_FILENAME))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    // Unique per writer so concurrent processes never share a temp file.
    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = parent.join(format!(
        ".{}.{}-{}.tmp",
        file_name.to_string_lossy(),
        std::process::id(),
        counter
    ));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;

    let written = file.write_all(contents).and_then(|()| {
        if durability == WriteDurability::Durable {
            file.sync_all()
        } else {
            Ok(())
        }
    });
    drop(file);
    if let Err(source) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: tmp_path,
            source,
        });
    }

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            dir.sync_all().map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}
