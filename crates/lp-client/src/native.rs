//! Native client runner.
//!
//! Drives a [`LivePatchClient`] from a `tokio-tungstenite` connection, the
//! way the browser binding drives it from `WebSocket` callbacks.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::{ClientError, CloseOutcome, LivePatchClient, Page, PatchOutcome};

/// What happened during one connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Content replacements applied.
    pub patches: usize,
    /// Reloads requested, by sentinel or by close policy.
    pub reloads: usize,
    /// Messages that could not be applied.
    pub failed: usize,
    /// Whether the server ended the connection.
    pub closed_by_server: bool,
}

/// Connect, then apply messages until the server closes the socket or
/// `shutdown` completes.
///
/// `shutdown` plays the role of page unload: the socket is closed if the
/// client's options ask for it.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or breaks.
pub async fn run<P, F>(client: &LivePatchClient<P>, shutdown: F) -> Result<RunSummary, ClientError>
where
    P: Page,
    F: Future<Output = ()>,
{
    let url = client.socket_url();
    tracing::info!(%url, "Connecting to live patch endpoint");
    let (stream, _response) = connect_async(url.as_str()).await?;
    let (mut write, mut read) = stream.split();

    if let Some(frame) = client.on_open() {
        write.send(Message::text(frame)).await?;
    }

    let mut summary = RunSummary::default();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                if client.on_unload() {
                    tracing::debug!("Closing live patch socket");
                    if let Err(err) = write.close().await {
                        tracing::debug!(%err, "Socket already gone");
                    }
                }
                break;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match client.on_message(text.as_str()) {
                    Ok(PatchOutcome::Patched) => summary.patches += 1,
                    Ok(PatchOutcome::Reloaded) => summary.reloads += 1,
                    Err(_) => summary.failed += 1,
                },
                Some(Ok(Message::Close(_))) | None => {
                    summary.closed_by_server = true;
                    if client.on_close() == CloseOutcome::Reloaded {
                        summary.reloads += 1;
                    }
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    client.on_close();
                    return Err(err.into());
                }
            }
        }
    }

    Ok(summary)
}
