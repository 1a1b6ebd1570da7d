// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Root-confined access to the files being viewed.
//!
//! Every path handed in by the HTTP surface, the tool server, or a navigation command is resolved
//! against one root directory. Paths that would leave the root (through `..` or a symlink) are
//! rejected; a leading `/` means "relative to the root".

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cap on the number of paths collected for the file picker.
pub const WALK_LIMIT: usize = 10_000;

#[derive(Debug)]
pub enum WorkspaceError {
    OutsideRoot { path: String },
    NotFound { path: String },
    NotADirectory { path: String },
    NotAFile { path: String },
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutsideRoot { path } => write!(f, "path is outside the viewer root: {path}"),
            Self::NotFound { path } => write!(f, "no such file or directory: {path}"),
            Self::NotADirectory { path } => write!(f, "not a directory: {path}"),
            Self::NotAFile { path } => write!(f, "not a file: {path}"),
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
        }
    }
}

impl std::error::Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DirEntryInfo {
    pub name: String,
    /// Root-relative path with `/` separators.
    pub path: String,
    pub is_dir: bool,
    /// Size in bytes; `0` for directories.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FileContent {
    pub path: String,
    /// Decoded text, or `None` for binary files.
    pub content: Option<String>,
    pub is_text: bool,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|source| io_error(root, source))?;
        if !canonical.is_dir() {
            return Err(WorkspaceError::NotADirectory {
                path: root.display().to_string(),
            });
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path onto the filesystem, refusing anything outside the root.
    ///
    /// Absolute paths inside the root are taken as-is; any other path is read relative to the
    /// root. The longest existing prefix is canonicalized so symlinks cannot escape, even for
    /// targets that do not exist yet.
    pub fn resolve(&self, request: &str) -> Result<PathBuf, WorkspaceError> {
        let requested = Path::new(request);
        let relative = match requested.strip_prefix(&self.root) {
            Ok(inside) if requested.is_absolute() => inside,
            _ => requested,
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(WorkspaceError::OutsideRoot {
                            path: request.to_owned(),
                        });
                    }
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }

        let full = self.root.join(normalized);
        let canonical = canonicalize_existing_prefix(&full)
            .map_err(|source| not_found_or_io(request, &full, source))?;
        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            Err(WorkspaceError::OutsideRoot {
                path: request.to_owned(),
            })
        }
    }

    /// Root-relative display form of a resolved path, using `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let inside = path.strip_prefix(&self.root).unwrap_or(path);
        inside
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn exists_file(&self, request: &str) -> bool {
        self.resolve(request).is_ok_and(|path| path.is_file())
    }

    /// Sorted listing of a directory; hidden entries are skipped.
    pub fn list_dir(&self, request: &str) -> Result<Vec<DirEntryInfo>, WorkspaceError> {
        let dir = self.resolve(request)?;
        let metadata = fs::metadata(&dir).map_err(|source| not_found_or_io(request, &dir, source))?;
        if !metadata.is_dir() {
            return Err(WorkspaceError::NotADirectory {
                path: request.to_owned(),
            });
        }

        let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;
        let mut items = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let metadata = fs::metadata(&path).map_err(|source| io_error(&path, source))?;
            let is_dir = metadata.is_dir();
            items.push(DirEntryInfo {
                name,
                path: self.relative(&path),
                is_dir,
                size: if is_dir { 0 } else { metadata.len() },
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// Reads a file; content containing a NUL byte is reported as binary without text.
    pub fn read_file(&self, request: &str) -> Result<FileContent, WorkspaceError> {
        let path = self.resolve(request)?;
        let metadata = fs::metadata(&path).map_err(|source| not_found_or_io(request, &path, source))?;
        if !metadata.is_file() {
            return Err(WorkspaceError::NotAFile {
                path: request.to_owned(),
            });
        }

        let raw = fs::read(&path).map_err(|source| io_error(&path, source))?;
        let is_text = memchr::memchr(0, &raw).is_none();
        let content = is_text.then(|| String::from_utf8_lossy(&raw).into_owned());
        Ok(FileContent {
            path: self.relative(&path),
            content,
            is_text,
            size: raw.len() as u64,
        })
    }

    /// Every non-hidden file below the root, depth first in name order, as root-relative paths.
    pub fn walk_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.walk_dir(&self.root, &mut out);
        out
    }

    fn walk_dir(&self, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let mut entries: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            if out.len() >= WALK_LIMIT {
                return;
            }
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                self.walk_dir(&path, out);
            } else if file_type.is_file() {
                out.push(self.relative(&path));
            }
        }
    }
}

/// Canonical form of the longest existing prefix of `path`, with the missing tail re-appended.
///
/// A dangling symlink on the way is reported as `NotFound`: its target cannot be checked.
fn canonicalize_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut missing = Vec::new();
    let mut existing = path;
    loop {
        match fs::canonicalize(existing) {
            Ok(canonical) => {
                return Ok(missing.iter().rev().fold(canonical, |acc, part| acc.join(part)));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if fs::symlink_metadata(existing).is_ok() {
                    return Err(err);
                }
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(err);
                };
                missing.push(name.to_os_string());
                existing = parent;
            }
            Err(err) => return Err(err),
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn not_found_or_io(request: &str, path: &Path, source: io::Error) -> WorkspaceError {
    if source.kind() == io::ErrorKind::NotFound {
        WorkspaceError::NotFound {
            path: request.to_owned(),
        }
    } else {
        io_error(path, source)
    }
}

#[cfg(test)]
mod tests;
