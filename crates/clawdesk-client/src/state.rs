//! Connection state types.

use std::fmt;

use serde::Serialize;

/// State of the gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Dialing the gateway at the caller's request.
    Connecting,
    /// Transport open; requests may be sent.
    Connected,
    /// Connection lost, waiting for or running the given reconnection attempt.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Permanently failed (max retries exceeded).
    Failed,
}

impl ConnectionState {
    /// Whether requests can be sent in this state.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether the manager is still trying to reach the gateway on its own.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Failed => f.write_str("failed"),
        }
    }
}
