//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use clawdesk_client::{ChatMessage, ConnectionState, InboundFrame, Metadata, Role};
use serde::Serialize;
use serde_json::Value;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a value: pretty JSON, or its table rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay + ?Sized,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }

    /// Write a value as one line: compact JSON, or its table rendering.
    ///
    /// Used for streams where each item must stay on its own line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_line<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay + ?Sized,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as human-readable text.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// The assistant's answer to a chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// Reply text.
    pub content: String,
}

impl TableDisplay for ChatReply {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.content)?;
        Ok(())
    }
}

/// Page snapshot metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct PageSnapshot(pub Metadata);

impl TableDisplay for PageSnapshot {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Page Snapshot")?;
        writeln!(writer, "══════════════════════════════════")?;
        if self.0.is_empty() {
            writeln!(writer, "(no data)")?;
            return Ok(());
        }

        let width = self.0.keys().map(String::len).max().unwrap_or(0);
        for (key, value) in &self.0 {
            writeln!(writer, "{key:<width$}  {}", display_value(value))?;
        }
        Ok(())
    }
}

/// Acknowledgement of an `act` or `navigate` request.
#[derive(Debug, Clone, Serialize)]
pub struct ActionAck {
    /// Request action: `act` or `navigate`.
    pub action: String,
    /// Action name or URL.
    pub target: String,
    /// Always true; failures are reported as errors instead.
    pub acknowledged: bool,
}

impl ActionAck {
    /// A successful acknowledgement.
    #[must_use]
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            acknowledged: true,
        }
    }
}

impl TableDisplay for ActionAck {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ {} {} acknowledged", self.action, self.target)?;
        Ok(())
    }
}

impl TableDisplay for InboundFrame {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.id {
            Some(id) => writeln!(writer, "[{}] {id}: {}", self.kind, self.content)?,
            None => writeln!(writer, "[{}] {}", self.kind, self.content)?,
        }
        Ok(())
    }
}

impl TableDisplay for ConnectionState {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "-- {self}")?;
        Ok(())
    }
}

impl TableDisplay for ChatMessage {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let speaker = match (self.role, self.failed) {
            (Role::User, _) => "you",
            (Role::Assistant, false) => "assistant",
            (Role::Assistant, true) => "assistant (error)",
        };
        writeln!(writer, "{speaker}> {}", self.content)?;
        Ok(())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
