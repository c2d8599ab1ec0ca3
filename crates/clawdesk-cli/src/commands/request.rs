//! One-shot request commands: chat, snapshot, act, navigate.

use std::io::Write;

use clawdesk_client::{Connector, GatewayClient, Metadata};
use serde_json::Value;

use crate::error::CliError;
use crate::output::{ActionAck, ChatReply, OutputFormat, PageSnapshot};

/// Send one chat message and print the reply.
///
/// # Errors
///
/// Returns an error if the request fails or output fails.
pub async fn chat<C: Connector, W: Write>(
    client: &GatewayClient<C>,
    writer: &mut W,
    format: &OutputFormat,
    text: &str,
) -> Result<(), CliError> {
    let content = client.chat(text).await?;
    format.write(writer, &ChatReply { content })
}

/// Print the current page snapshot.
///
/// # Errors
///
/// Returns an error if the request fails or output fails.
pub async fn snapshot<C: Connector, W: Write>(
    client: &GatewayClient<C>,
    writer: &mut W,
    format: &OutputFormat,
) -> Result<(), CliError> {
    let metadata = client.snapshot().await?;
    format.write(writer, &PageSnapshot(metadata))
}

/// Perform an action with `KEY=VALUE` parameters.
///
/// # Errors
///
/// Returns an error if a parameter is malformed, the request fails or output
/// fails.
pub async fn act<C: Connector, W: Write>(
    client: &GatewayClient<C>,
    writer: &mut W,
    format: &OutputFormat,
    action: &str,
    params: &[String],
) -> Result<(), CliError> {
    let params = parse_params(params)?;
    client.act(action, params).await?;
    format.write(writer, &ActionAck::new("act", action))
}

/// Ask the host to load `url`.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the request fails or output fails.
pub async fn navigate<C: Connector, W: Write>(
    client: &GatewayClient<C>,
    writer: &mut W,
    format: &OutputFormat,
    url: &str,
) -> Result<(), CliError> {
    client.navigate(url).await?;
    format.write(writer, &ActionAck::new("navigate", url))
}

/// Parse `KEY=VALUE` pairs into action parameters.
///
/// Values that parse as JSON keep their type; anything else is a string.
/// Returns `None` for an empty list so no `params` field is sent.
///
/// # Errors
///
/// Returns an error if a pair has no `=` or an empty key.
pub fn parse_params(pairs: &[String]) -> Result<Option<Metadata>, CliError> {
    if pairs.is_empty() {
        return Ok(None);
    }

    let mut params = Metadata::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| CliError::InvalidArgument(format!("expected KEY=VALUE, got '{pair}'")))?;
        if key.is_empty() {
            return Err(CliError::InvalidArgument(format!("empty key in '{pair}'")));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.insert(key.to_string(), value);
    }
    Ok(Some(params))
}
