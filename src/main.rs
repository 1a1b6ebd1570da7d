// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Context Viewer CLI entrypoint.
//!
//! By default this runs the terminal viewer and serves the HTTP API plus MCP over streamable HTTP
//! at `http://127.0.0.1:<port>`. `--headless` serves the same endpoints without a terminal UI.
//!
//! Use `--mcp` to run the MCP server over stdio instead (intended for tool integrations).

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use context_viewer::config::{CliOptions, RunMode, ViewerConfig, DEFAULT_PORT};
use context_viewer::launcher::{LaunchConfig, ViewerLauncher};
use context_viewer::logging::{init_logging, LogTarget};
use context_viewer::mcp::ContextViewerMcp;
use context_viewer::store::{StateStore, WriteDurability};
use context_viewer::web::{self, AppState};
use context_viewer::workspace::Workspace;
use tokio::net::TcpListener;
use tracing::{info, warn};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [<root>] [--port <port>] [--state-file <path>] [--durable-writes]\n  {program} [<root>] [--port <port>] [--state-file <path>] [--durable-writes] --headless\n  {program} [<root>] [--port <port>] [--state-file <path>] [--durable-writes] --mcp\n\nThe default mode runs the terminal viewer and serves the HTTP API and MCP at\n`http://127.0.0.1:<port>` (0 = ephemeral; default {DEFAULT_PORT}).\n--headless serves the same endpoints without a terminal UI until Ctrl-C or SIGTERM.\n--mcp serves MCP over stdio; `open_viewer` starts a headless viewer on <port> when needed.\n\nIf <root> is omitted, the current working directory is used. A file as <root> opens it in\nits parent directory.\n--state-file defaults to $CONTEXT_VIEWER_STATE_FILE, then ~/.context-viewer-state.json.\n--durable-writes opts into slower, best-effort durable persistence (fsync where supported)."
    );
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mcp" => {
                if options.mcp {
                    return Err(());
                }
                options.mcp = true;
            }
            "--headless" => {
                if options.headless {
                    return Err(());
                }
                options.headless = true;
            }
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.port = Some(port);
            }
            "--state-file" => {
                if options.state_file.is_some() {
                    return Err(());
                }
                let path = args.next().ok_or(())?;
                if path.trim().is_empty() {
                    return Err(());
                }
                options.state_file = Some(path);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.root.is_some() {
                    return Err(());
                }
                options.root = Some(arg);
            }
        }
    }

    if options.mcp && options.headless {
        return Err(());
    }

    Ok(options)
}

/// A file given as the root opens inside its parent directory.
fn open_workspace(root: &Path) -> Result<(Workspace, Option<String>), Box<dyn Error>> {
    if root.is_file() {
        let parent = root
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let initial_file = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        return Ok((Workspace::open(parent)?, initial_file));
    }
    Ok((Workspace::open(root)?, None))
}

/// A bound viewer endpoint that has advertised itself in the state file.
struct BoundViewer {
    listener: TcpListener,
    store: Arc<StateStore>,
    workspace: Arc<Workspace>,
    server_url: String,
}

impl BoundViewer {
    async fn bind(config: &ViewerConfig, workspace: Workspace) -> Result<Self, Box<dyn Error>> {
        let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
        let port = listener.local_addr()?.port();
        let server_url = format!("http://127.0.0.1:{port}");

        let store = Arc::new(config.state_store());
        store.reset(&server_url, std::process::id())?;
        info!(
            server_url = %server_url,
            root = ?workspace.root(),
            state_file = ?store.path(),
            "viewer listening"
        );

        Ok(Self {
            listener,
            store,
            workspace: Arc::new(workspace),
            server_url,
        })
    }

    fn into_parts(self) -> (TcpListener, AppState, ContextViewerMcp) {
        let mcp = ContextViewerMcp::new(Arc::clone(&self.store), Arc::clone(&self.workspace))
            .with_viewer_url(self.server_url.clone());
        let state = AppState {
            store: self.store,
            workspace: self.workspace,
            server_url: Some(self.server_url),
        };
        (self.listener, state, mcp)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown requested");
}

fn run_mcp(config: &ViewerConfig) -> Result<(), Box<dyn Error>> {
    init_logging(LogTarget::Stderr)?;
    let (workspace, _) = open_workspace(&config.root)?;
    let store = Arc::new(config.state_store());

    let launch = LaunchConfig {
        program: std::env::current_exe()?,
        root: workspace.root().to_path_buf(),
        port: config.port,
        durable_writes: config.durability == WriteDurability::Durable,
    };
    let launcher = Arc::new(ViewerLauncher::new(Arc::clone(&store), launch));
    info!(root = ?workspace.root(), state_file = ?store.path(), "serving MCP over stdio");
    let mcp = ContextViewerMcp::new(store, Arc::new(workspace)).with_launcher(launcher);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(mcp.serve_stdio())?;
    Ok(())
}

fn run_headless(config: &ViewerConfig) -> Result<(), Box<dyn Error>> {
    init_logging(LogTarget::Stderr)?;
    let (workspace, _) = open_workspace(&config.root)?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        let viewer = BoundViewer::bind(config, workspace).await?;
        let store = Arc::clone(&viewer.store);
        let (listener, state, mcp) = viewer.into_parts();

        web::serve_until(listener, state, mcp, shutdown_signal()).await;
        store.reset_empty()?;
        Ok::<(), Box<dyn Error>>(())
    })
}

fn run_terminal(config: &ViewerConfig) -> Result<(), Box<dyn Error>> {
    // The alternate screen owns the terminal; logs go next to the state file.
    init_logging(LogTarget::File(config.log_file()))?;
    let (workspace, initial_file) = open_workspace(&config.root)?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        let viewer = BoundViewer::bind(config, workspace).await?;
        let store = Arc::clone(&viewer.store);
        let tui_store = Arc::clone(&viewer.store);
        let tui_workspace = Arc::clone(&viewer.workspace);
        let tui_url = viewer.server_url.clone();
        let (listener, state, mcp) = viewer.into_parts();

        let tui = tokio::task::spawn_blocking(move || {
            context_viewer::tui::run(tui_store, tui_workspace, initial_file, Some(tui_url))
        });
        let tui_result = web::serve_until(listener, state, mcp, tui).await;
        store.reset_empty()?;

        tui_result??;
        Ok::<(), Box<dyn Error>>(())
    })
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "context-viewer".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let config = ViewerConfig::from_env(options)?;
        match config.mode {
            RunMode::Mcp => run_mcp(&config),
            RunMode::Headless => run_headless(&config),
            RunMode::Terminal => run_terminal(&config),
        }
    })();

    if let Err(err) = result {
        eprintln!("context-viewer: {err}");
        std::process::exit(1);
    }
}
