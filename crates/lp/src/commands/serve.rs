//! `lp serve` command implementation.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use lp_config::{CliSettings, Config};
use lp_protocol::ClosePolicy;
use lp_server::{PreviewServer, server_config_from_lp_config, shutdown_signal};

use crate::error::CliError;
use crate::output::Output;

/// Close policy as a command-line value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ClosePolicyArg {
    /// Leave the page as it is.
    Ignore,
    /// Reload the page.
    Reload,
}

impl From<ClosePolicyArg> for ClosePolicy {
    fn from(arg: ClosePolicyArg) -> Self {
        match arg {
            ClosePolicyArg::Ignore => Self::Ignore,
            ClosePolicyArg::Reload => Self::Reload,
        }
    }
}

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover livepatch.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of rendered HTML (overrides config).
    #[arg(short, long)]
    build_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Open the served book in a browser (overrides config).
    #[arg(long)]
    open: bool,

    /// Enable verbose output (show request and patch logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable live patching (default: enabled).
    #[arg(long)]
    live_patch: Option<bool>,

    /// Disable live patching.
    #[arg(long, conflicts_with = "live_patch")]
    no_live_patch: bool,

    /// What pages do when the live patch socket closes (overrides config).
    #[arg(long, value_enum)]
    close_policy: Option<ClosePolicyArg>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.highlight(&format!(
            "Serving on http://{}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Build directory: {}",
            config.preview_resolved.build_dir.display()
        ));
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }

        if config.live_patch.enabled {
            output.info(&format!(
                "Live patch: enabled (close policy: {:?})",
                config.live_patch.close_policy
            ));
        } else {
            output.warning("Live patch: disabled");
        }

        let server = PreviewServer::bind(server_config_from_lp_config(&config)).await?;
        if config.server.open_browser {
            open_browser(&output, &browser_url(server.local_addr()?));
        }
        server.serve(shutdown_signal()).await?;

        output.success("Server stopped");
        Ok(())
    }

    /// Build config overrides from the flags.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            build_dir: self.build_dir.clone(),
            live_patch_enabled: self.resolve_live_patch_enabled(),
            close_policy: self.close_policy.map(ClosePolicy::from),
            open_browser: self.open.then_some(true),
        }
    }

    /// Resolve `live_patch_enabled` from --live-patch/--no-live-patch flags.
    fn resolve_live_patch_enabled(&self) -> Option<bool> {
        self.no_live_patch.then_some(false).or(self.live_patch)
    }
}

/// Address to open in a browser for a bound server.
fn browser_url(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("http://localhost:{}/", addr.port())
    } else {
        format!("http://{addr}/")
    }
}

fn open_browser(output: &Output, url: &str) {
    match opener::open(url) {
        Ok(()) => tracing::info!(%url, "Opened web browser"),
        Err(err) => output.warning(&format!("Cannot open web browser at {url}: {err}")),
    }
}
