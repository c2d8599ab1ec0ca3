//! CLI command implementations.
//!
//! - [`request`] - one-shot chat, snapshot, act and navigate
//! - [`watch`] - stream gateway events
//! - [`repl`] - interactive chat session

pub mod repl;
pub mod request;
pub mod watch;

pub use repl::repl;
pub use request::{act, chat, navigate, parse_params, snapshot};
pub use watch::watch;
