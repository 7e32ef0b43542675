//! CLI error types.

use lp_client::ClientError;
use lp_config::ConfigError;
use lp_protocol::ProtocolError;
use lp_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("Invalid page URL: {0}")]
    PageUrl(#[from] ProtocolError),
}
