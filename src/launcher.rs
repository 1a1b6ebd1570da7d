// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Finding or starting a viewer process for the tool server.
//!
//! A viewer advertises itself by writing `server_url` and `server_pid` into the state file. The
//! launcher reuses an advertised viewer whose pid is still alive; otherwise it starts this binary
//! in headless mode and waits for the new process to advertise itself. A viewer started here is
//! stopped again when the launcher is dropped.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::store::StateStore;

const READY_TIMEOUT: Duration = Duration::from_secs(10);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum LaunchError {
    Spawn { program: PathBuf, source: io::Error },
    Exited { status: String },
    NotReady { pid: u32 },
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => write!(f, "cannot start viewer {program:?}: {source}"),
            Self::Exited { status } => write!(f, "viewer exited during startup ({status})"),
            Self::NotReady { pid } => {
                write!(f, "viewer (pid {pid}) did not report its address in time")
            }
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// How to start a headless viewer that shares this process's state file and root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub program: PathBuf,
    pub root: PathBuf,
    pub port: u16,
    pub durable_writes: bool,
}

impl LaunchConfig {
    fn command(&self, store: &StateStore) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(&self.root)
            .arg("--headless")
            .arg("--port")
            .arg(self.port.to_string())
            .arg("--state-file")
            .arg(store.path());
        if self.durable_writes {
            command.arg("--durable-writes");
        }
        // stdout may carry the MCP stdio transport of the parent.
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::inherit());
        command
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerHandle {
    pub server_url: String,
    pub server_pid: u32,
    pub started: bool,
}

#[derive(Debug)]
pub struct ViewerLauncher {
    store: Arc<StateStore>,
    config: LaunchConfig,
    spawned: Mutex<Option<Child>>,
}

impl ViewerLauncher {
    pub fn new(store: Arc<StateStore>, config: LaunchConfig) -> Self {
        Self {
            store,
            config,
            spawned: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// The viewer advertised in the state file, if its process is still alive.
    ///
    /// A viewer this launcher started is checked through its `Child`, since an unreaped exited
    /// child still answers `kill(pid, 0)`.
    pub fn running_viewer(&self) -> Option<ViewerHandle> {
        let state = self.store.load();
        let server_url = state.server_url?;
        let server_pid = state.server_pid?;
        if self.spawned_child_exited(server_pid) {
            return None;
        }
        is_pid_alive(server_pid).then_some(ViewerHandle {
            server_url,
            server_pid,
            started: false,
        })
    }

    /// Reuses a live viewer or starts a new one and waits until it is reachable.
    pub async fn ensure_viewer(&self) -> Result<ViewerHandle, LaunchError> {
        if let Some(handle) = self.running_viewer() {
            return Ok(handle);
        }

        let pid = self.spawn()?;
        let deadline = Instant::now() + READY_TIMEOUT;
        loop {
            let state = self.store.load();
            if let (Some(server_url), Some(server_pid)) = (state.server_url, state.server_pid) {
                if server_pid == pid {
                    info!(url = %server_url, pid, "viewer started");
                    return Ok(ViewerHandle {
                        server_url,
                        server_pid,
                        started: true,
                    });
                }
            }
            if let Some(status) = self.exit_status() {
                return Err(LaunchError::Exited { status });
            }
            if Instant::now() >= deadline {
                return Err(LaunchError::NotReady { pid });
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    fn spawn(&self) -> Result<u32, LaunchError> {
        let mut spawned = self.spawned.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = spawned.take() {
            stop_child(previous);
        }
        let child = self
            .config
            .command(&self.store)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;
        let pid = child.id();
        info!(pid, root = ?self.config.root, port = self.config.port, "starting headless viewer");
        *spawned = Some(child);
        Ok(pid)
    }

    /// Reaps the spawned child if it is `pid` and has exited.
    fn spawned_child_exited(&self, pid: u32) -> bool {
        let mut spawned = self.spawned.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(child) = spawned.as_mut().filter(|child| child.id() == pid) else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                warn!(pid, %status, "viewer exited without clearing its address");
                spawned.take();
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!(pid, error = %err, "cannot check viewer status");
                false
            }
        }
    }

    fn exit_status(&self) -> Option<String> {
        let mut spawned = self.spawned.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let child = spawned.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                spawned.take();
                Some(status.to_string())
            }
            Ok(None) => None,
            Err(err) => Some(err.to_string()),
        }
    }

    /// Stops a viewer this launcher started, if any.
    pub fn shutdown(&self) {
        let mut spawned = self.spawned.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(child) = spawned.take() {
            stop_child(child);
        }
    }
}

impl Drop for ViewerLauncher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Asks the child to exit (SIGTERM on unix so it can reset the state file), then kills it.
fn stop_child(mut child: Child) {
    let pid = child.id();
    #[cfg(unix)]
    {
        // SAFETY: plain signal delivery to a child we spawned and have not reaped yet.
        #[allow(unsafe_code)]
        let delivered = unsafe { libc::kill(pid as i32, libc::SIGTERM) == 0 };
        if delivered {
            for _ in 0..20 {
                if matches!(child.try_wait(), Ok(Some(_))) {
                    info!(pid, "viewer stopped");
                    return;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
    if let Err(err) = child.kill() {
        warn!(pid, error = %err, "cannot stop viewer");
    }
    let _ = child.wait();
}

pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        let Ok(pid) = i32::try_from(pid) else {
            return false;
        };
        if pid <= 0 {
            return false;
        }
        // SAFETY: signal 0 only checks for existence and permission.
        #[allow(unsafe_code)]
        unsafe {
            libc::kill(pid, 0) == 0
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TempDir;

    fn launcher(tmp: &TempDir) -> ViewerLauncher {
        ViewerLauncher::new(
            Arc::new(tmp.store()),
            LaunchConfig {
                program: tmp.path().join("missing-viewer-binary"),
                root: tmp.path().to_path_buf(),
                port: 0,
                durable_writes: false,
            },
        )
    }

    #[cfg(unix)]
    #[test]
    fn own_pid_is_alive_and_pid_zero_is_not() {
        assert!(is_pid_alive(std::process::id()));
        assert!(!is_pid_alive(0));
        assert!(!is_pid_alive(u32::MAX));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reuses_a_live_advertised_viewer() {
        let tmp = TempDir::new("launcher-reuse");
        let launcher = launcher(&tmp);
        tmp.store().reset("http://127.0.0.1:8765", std::process::id()).unwrap();

        let handle = launcher.ensure_viewer().await.unwrap();
        assert_eq!(handle.server_url, "http://127.0.0.1:8765");
        assert!(!handle.started);
    }

    #[cfg(unix)]
    #[test]
    fn exited_spawned_viewer_is_not_reported_as_running() {
        let tmp = TempDir::new("launcher-exited");
        let launcher = ViewerLauncher::new(
            Arc::new(tmp.store()),
            LaunchConfig {
                program: PathBuf::from("true"),
                root: tmp.path().to_path_buf(),
                port: 0,
                durable_writes: false,
            },
        );
        let pid = launcher.spawn().unwrap();
        tmp.store().reset("http://127.0.0.1:8765", pid).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while launcher.running_viewer().is_some() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(launcher.running_viewer().is_none());
        assert!(launcher.spawned.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let tmp = TempDir::new("launcher-spawn");
        let launcher = launcher(&tmp);
        assert!(launcher.running_viewer().is_none());
        assert!(matches!(
            launcher.ensure_viewer().await,
            Err(LaunchError::Spawn { .. })
        ));
    }
}
