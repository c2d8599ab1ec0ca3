//! Watch command: stream unsolicited gateway frames and connection changes.

use std::future::Future;
use std::io::Write;

use clawdesk_client::{Connector, GatewayClient};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::CliError;
use crate::output::OutputFormat;

/// Print every unsolicited frame and state change until `shutdown` resolves
/// or the connection ends for good (Disconnected or Failed).
///
/// # Errors
///
/// Returns an error if writing output fails.
pub async fn watch<C, W, S>(
    client: &GatewayClient<C>,
    writer: &mut W,
    format: &OutputFormat,
    shutdown: S,
) -> Result<(), CliError>
where
    C: Connector,
    W: Write,
    S: Future<Output = ()>,
{
    let (tx, mut frames) = mpsc::unbounded_channel();
    let subscription = client.subscribe(move |frame| {
        let _ = tx.send(frame.clone());
    });
    let mut states = client.watch_state();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            () = &mut shutdown => {
                debug!("watch interrupted");
                break Ok(());
            }
            Some(frame) = frames.recv() => {
                if let Err(e) = format.write_line(writer, &frame) {
                    break Err(e);
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = *states.borrow_and_update();
                if let Err(e) = format.write_line(writer, &state) {
                    break Err(e);
                }
                // Nothing more can arrive until someone reconnects explicitly.
                if !state.is_connected() && !state.is_transitional() {
                    debug!(%state, "gateway gone, stopping watch");
                    break Ok(());
                }
            }
        }
    };

    client.unsubscribe(subscription);
    result
}
