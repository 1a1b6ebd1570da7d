// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Runtime configuration resolved from command-line options and the environment.
//!
//! Precedence is CLI flag, then environment variable, then built-in default.

use std::fmt;
use std::path::PathBuf;

use crate::store::{default_state_path, StateStore, WriteDurability};

pub const DEFAULT_PORT: u16 = 8765;
pub const STATE_FILE_ENV: &str = "CONTEXT_VIEWER_STATE_FILE";
pub const PORT_ENV: &str = "CONTEXT_VIEWER_PORT";
pub const DEBUG_ENV: &str = "CONTEXT_VIEWER_DEBUG";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Terminal viewer plus HTTP/MCP server.
    #[default]
    Terminal,
    /// HTTP/MCP server only; stops on Ctrl-C or SIGTERM.
    Headless,
    /// MCP over stdio for tool integrations.
    Mcp,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub root: Option<String>,
    pub port: Option<u16>,
    pub state_file: Option<String>,
    pub durable_writes: bool,
    pub headless: bool,
    pub mcp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NoHomeDirectory,
    InvalidPort { source_name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHomeDirectory => write!(
                f,
                "cannot locate the home directory; pass --state-file or set {STATE_FILE_ENV}"
            ),
            Self::InvalidPort { source_name, value } => {
                write!(f, "invalid port in {source_name}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub root: PathBuf,
    pub port: u16,
    pub state_file: PathBuf,
    pub durability: WriteDurability,
    pub mode: RunMode,
}

impl ViewerConfig {
    pub fn from_env(options: CliOptions) -> Result<Self, ConfigError> {
        Self::resolve(options, |key| std::env::var(key).ok(), default_state_path)
    }

    /// Resolves against an arbitrary environment lookup and default state location.
    pub fn resolve(
        options: CliOptions,
        env: impl Fn(&str) -> Option<String>,
        default_state_file: impl FnOnce() -> Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let port = match options.port {
            Some(port) => port,
            None => match env(PORT_ENV).filter(|raw| !raw.trim().is_empty()) {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort {
                    source_name: PORT_ENV,
                    value: raw,
                })?,
                None => DEFAULT_PORT,
            },
        };

        let state_file = match options
            .state_file
            .or_else(|| env(STATE_FILE_ENV).filter(|raw| !raw.trim().is_empty()))
        {
            Some(path) => PathBuf::from(path),
            None => default_state_file().ok_or(ConfigError::NoHomeDirectory)?,
        };

        let mode = if options.mcp {
            RunMode::Mcp
        } else if options.headless {
            RunMode::Headless
        } else {
            RunMode::Terminal
        };

        Ok(Self {
            root: PathBuf::from(options.root.unwrap_or_else(|| ".".to_owned())),
            port,
            state_file,
            durability: if options.durable_writes {
                WriteDurability::Durable
            } else {
                WriteDurability::BestEffort
            },
            mode,
        })
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.state_file).with_durability(self.durability)
    }

    /// Log destination for the terminal viewer, next to the state file.
    pub fn log_file(&self) -> PathBuf {
        let mut name = self.state_file.file_name().map(|name| name.to_os_string()).unwrap_or_default();
        name.push(".log");
        self.state_file.with_file_name(name)
    }
}

/// Whether a debug switch value means "on".
pub fn flag_enabled(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some("1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
    )
}
