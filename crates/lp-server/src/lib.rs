//! Preview server with live patching for rendered documentation.
//!
//! This crate provides a native Rust HTTP server using axum, serving:
//! - Rendered HTML pages from a build directory, with the live-patch client
//!   script injected
//! - The client script itself
//! - The WebSocket endpoint clients connect to for patches
//!
//! Patches come from the [`PatchRegistry`]. An external renderer can publish
//! to it directly; the bundled file watcher publishes the `<main>` region of
//! every HTML file that changes in the build directory.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use lp_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         build_dir: PathBuf::from("book"),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum server (lp-server)
//!                        │
//!                        ├─► Static files (build dir, client script injected)
//!                        │
//!                        └─► WebSocket /__mdbook_incremental_preview_live_patch/<page>
//!                                │
//!                                └─► PatchRegistry ◄── LivePatchManager ◄── notify
//!                                          ▲
//!                                          └── external renderer
//! ```

mod app;
mod client_script;
mod error;
mod live_patch;
mod middleware;
mod pages;
mod state;
mod static_files;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use lp_protocol::ClientOptions;
use state::AppState;
use tokio::net::TcpListener;

pub use error::ServerError;
pub use live_patch::PatchRegistry;

use live_patch::LivePatchManager;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on (0 picks a free port).
    pub port: u16,
    /// Directory of rendered HTML to serve.
    pub build_dir: PathBuf,
    /// Enable live patching.
    pub live_patch_enabled: bool,
    /// Watch patterns for live patching.
    pub watch_patterns: Option<Vec<String>>,
    /// Debounce window for file events in milliseconds.
    pub debounce_ms: u64,
    /// Options handed to every client.
    pub client_options: ClientOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            build_dir: PathBuf::from("book"),
            live_patch_enabled: true,
            watch_patterns: None,
            debounce_ms: 100,
            client_options: ClientOptions::default(),
        }
    }
}

/// A bound preview server, ready to serve.
pub struct PreviewServer {
    listener: TcpListener,
    state: Arc<AppState>,
    _manager: Option<LivePatchManager>,
}

impl PreviewServer {
    /// Bind the listener and start watching the build directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the build directory is missing, the address cannot
    /// be bound, or the file watcher cannot be created.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if !config.build_dir.is_dir() {
            return Err(ServerError::BuildDirMissing(config.build_dir));
        }

        let registry = Arc::new(PatchRegistry::new());

        let (manager, client_script) = if config.live_patch_enabled {
            let mut manager = LivePatchManager::new(
                config.build_dir.clone(),
                config.watch_patterns.clone(),
                Arc::clone(&registry),
            )?
            .with_debounce_ms(config.debounce_ms);
            manager.start()?;
            let script = client_script::render(&config.client_options)?;
            (Some(manager), Some(script))
        } else {
            (None, None)
        };

        let state = Arc::new(AppState {
            build_dir: config.build_dir,
            registry,
            client_script,
        });

        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        tracing::info!(address = %listener.local_addr()?, "Starting server");

        Ok(Self {
            listener,
            state,
            _manager: manager,
        })
    }

    /// Address the server is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Registry clients are subscribed to. Publish here to patch pages.
    #[must_use]
    pub fn registry(&self) -> Arc<PatchRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// Serve until `shutdown` completes.
    ///
    /// On shutdown the registry is cleared, which ends every subscribed
    /// WebSocket.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let registry = Arc::clone(&self.state.registry);
        let app = app::create_router(self.state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                registry.clear();
            })
            .await?;

        Ok(())
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    PreviewServer::bind(config)
        .await?
        .serve(shutdown_signal())
        .await
}

/// Wait for shutdown signal (Ctrl-C).
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from livepatch config.
#[must_use]
pub fn server_config_from_lp_config(config: &lp_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        build_dir: config.preview_resolved.build_dir.clone(),
        live_patch_enabled: config.live_patch.enabled,
        watch_patterns: config.live_patch.watch_patterns.clone(),
        debounce_ms: config.live_patch.debounce_ms,
        client_options: config.live_patch.client_options(),
    }
}
