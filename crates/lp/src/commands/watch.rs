//! `lp watch` command implementation.
//!
//! Connects to a served page's live patch socket the way a browser tab
//! does, and writes every patch to stdout or a file.

use std::cell::Cell;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use lp_client::native::run;
use lp_client::{ClientError, LivePatchClient, Page};
use lp_protocol::{ClientOptions, ClosePolicy, PageLocation};

use crate::error::CliError;
use crate::output::Output;

/// Pause before reconnecting after the server asked for a reload.
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// URL of the page to follow, e.g. `http://localhost:3000/chapter1`.
    page_url: String,

    /// Write the latest content to this file instead of stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Reconnect whenever the server closes the socket.
    #[arg(long)]
    reload_on_close: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// Runs until Ctrl-C, or until the server closes the socket without
    /// asking for a reload.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let location = PageLocation::parse(&self.page_url)?;
        let options = ClientOptions {
            close_policy: if self.reload_on_close {
                ClosePolicy::Reload
            } else {
                ClosePolicy::Ignore
            },
            ..ClientOptions::default()
        };
        let client = LivePatchClient::new(TerminalPage::new(location, self.out), options);
        output.highlight(&format!("Watching {}", client.socket_url()));

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            let summary = run(&client, shutdown.as_mut()).await?;
            tracing::info!(?summary, "Live patch connection ended");

            if !summary.closed_by_server {
                break;
            }
            if !client.page().take_reload() {
                output.info("Server closed the connection");
                break;
            }
            output.info("Reconnecting...");
            tokio::time::sleep(RECONNECT_DELAY).await;
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

/// A page rendered to the terminal or a file.
struct TerminalPage {
    location: PageLocation,
    out: Option<PathBuf>,
    output: Output,
    reload_requested: Cell<bool>,
}

impl TerminalPage {
    fn new(location: PageLocation, out: Option<PathBuf>) -> Self {
        Self {
            location,
            out,
            output: Output::new(),
            reload_requested: Cell::new(false),
        }
    }

    /// Whether a reload was requested since the last call.
    fn take_reload(&self) -> bool {
        self.reload_requested.replace(false)
    }
}

impl Page for TerminalPage {
    fn location(&self) -> PageLocation {
        self.location.clone()
    }

    fn reload(&self) {
        self.reload_requested.set(true);
        self.output.warning("Page reload requested");
    }

    fn replace_content(&self, _selector: &str, html: &str) -> Result<(), ClientError> {
        match &self.out {
            Some(path) => std::fs::write(path, html),
            None => self.output.content(html),
        }
        .map_err(|err| ClientError::Dom(err.to_string()))?;

        self.output.success(&format!(
            "Patched {} ({} bytes)",
            self.location.path(),
            html.len()
        ));
        Ok(())
    }

    fn dispatch_load(&self) {
        tracing::debug!(path = self.location.path(), "Content loaded");
    }
}
