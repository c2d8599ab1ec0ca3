//! Interactive chat session backed by the assistant panel model.

use std::io::Write;

use clawdesk_client::{AssistantPanel, Connector};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::CliError;
use crate::output::OutputFormat;

const HELP: &str = "commands: /clear, /state, /quit";

/// Run a chat session reading one message per line from `input`.
///
/// `/quit` ends the session, `/clear` empties the transcript and `/state`
/// prints the connection state.
///
/// # Errors
///
/// Returns an error if the gateway is unreachable or IO fails.
pub async fn repl<C, R, W>(
    panel: &mut AssistantPanel<C>,
    input: R,
    writer: &mut W,
    format: &OutputFormat,
) -> Result<(), CliError>
where
    C: Connector,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if !panel.connect().await {
        let reason = panel.error().unwrap_or("connection failed").to_string();
        return Err(CliError::Gateway(clawdesk_client::GatewayError::Connection(reason)));
    }

    for message in panel.messages() {
        format.write_line(writer, message)?;
    }
    if !format.is_json() {
        writeln!(writer, "({HELP})")?;
    }

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => panel.clear_messages(),
            "/state" => format.write_line(writer, &panel.connection_state())?,
            "/help" => writeln!(writer, "{HELP}")?,
            text if text.is_empty() => {}
            text => {
                let before = panel.messages().len();
                panel.send_message(text).await;
                // The user's own line is already on screen.
                for message in panel.messages().iter().skip(before + 1) {
                    format.write_line(writer, message)?;
                }
            }
        }
    }

    panel.disconnect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use clawdesk_client::{ClientConfig, GatewayClient, InboundFrame, MemoryConnector};

    #[tokio::test]
    async fn repl_chats_until_quit() {
        let (connector, mut peers) = MemoryConnector::new();
        let client = GatewayClient::with_connector(ClientConfig::default(), connector).unwrap();
        let mut panel = AssistantPanel::new(client);

        let gateway = tokio::spawn(async move {
            let mut peer = peers.recv().await.unwrap();
            let request = peer.recv_request().await.unwrap();
            peer.reply(&InboundFrame::message(request.id, "It is sunny."))
                .await;
            peer.recv().await
        });

        let input: &[u8] = b"what's the weather?\n\n/quit\nnever sent\n";
        let mut out = Vec::new();
        repl(&mut panel, input, &mut out, &OutputFormat::new(Format::Table))
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("assistant> Hi!"));
        assert!(out.contains("assistant> It is sunny."));
        // Disconnect closed the connection before anything else was sent.
        assert_eq!(gateway.await.unwrap(), None);
    }

    #[tokio::test]
    async fn repl_reports_unreachable_gateway() {
        let (connector, _peers) = MemoryConnector::new();
        connector.set_refusing(true);
        let client = GatewayClient::with_connector(ClientConfig::default(), connector).unwrap();
        let mut panel = AssistantPanel::new(client);

        let input: &[u8] = b"hello\n";
        let err = repl(&mut panel, input, &mut Vec::new(), &OutputFormat::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to connect to AI backend"));
    }
}
