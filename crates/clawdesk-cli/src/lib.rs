//! # clawdesk-cli
//!
//! Command-line front end for the clawdesk assistant gateway.
//!
//! Provides commands for:
//! - One-shot chat, page snapshot, page actions and navigation
//! - Watching unsolicited gateway events
//! - An interactive chat session
//!
//! ```text
//! ┌──────────┐   JSON text frames    ┌───────────────────┐
//! │ clawdesk │◄─────────────────────►│ assistant gateway │
//! └──────────┘     (WebSocket)       └───────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{ActArgs, Cli, Commands, Format};
pub use error::CliError;
pub use output::OutputFormat;
