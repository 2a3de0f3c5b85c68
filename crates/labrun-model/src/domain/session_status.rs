use serde::{Deserialize, Serialize};

/// Current state of an interactive notebook session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session was requested and is waiting to be picked up.
    Pending,
    /// The agent claimed the session and is about to launch the server.
    Starting,
    /// The server process was spawned; port, token, and pid are assigned.
    Running,
    /// The server could not be started.
    Error,
}

impl SessionStatus {
    /// Returns `true` if the session won't transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Error)
    }

    /// Wire representation, as stored in the queue's `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Error => "error",
        }
    }
}
