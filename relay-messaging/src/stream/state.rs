use std::fmt;
use std::time::Duration;

/// Lifecycle of one stream session
///
/// `Init -> Open -> Active -> {Closed, Expired, Failed}`. Open and Active
/// may also fail directly (presence write or transport errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Init,
    /// Presence record written
    Open,
    /// Poller and keep-alive timers running
    Active,
    /// The client closed the stream or went away
    Closed,
    /// The absolute age limit was reached
    Expired,
    /// Keep-alive timeout, transport error or presence failure
    Failed,
}

impl SessionState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Expired | Self::Failed)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Open)
                | (Self::Init | Self::Open, Self::Failed)
                | (Self::Open, Self::Active)
                | (Self::Active, Self::Closed | Self::Expired | Self::Failed)
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Open => "open",
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    ClientClosed,
    Disconnected,
    /// The relay is shutting down
    Shutdown,
    MaxAgeReached,
    KeepAliveTimeout,
    Transport(String),
}

impl EndReason {
    /// Terminal state reached for this reason
    #[must_use]
    pub const fn terminal_state(&self) -> SessionState {
        match self {
            Self::ClientClosed | Self::Disconnected | Self::Shutdown => SessionState::Closed,
            Self::MaxAgeReached => SessionState::Expired,
            Self::KeepAliveTimeout | Self::Transport(_) => SessionState::Failed,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientClosed => f.write_str("client closed the stream"),
            Self::Disconnected => f.write_str("client disconnected"),
            Self::Shutdown => f.write_str("relay shutting down"),
            Self::MaxAgeReached => f.write_str("maximum stream age reached"),
            Self::KeepAliveTimeout => f.write_str("no ping received before keep-alive timeout"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// Result of a completed session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session_id: String,
    pub state: SessionState,
    pub reason: EndReason,
    /// Messages pushed to the client
    pub delivered: usize,
    pub lifetime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use SessionState::*;

        assert!(Init.can_transition_to(Open));
        assert!(Open.can_transition_to(Active));
        assert!(Open.can_transition_to(Failed));
        for terminal in [Closed, Expired, Failed] {
            assert!(Active.can_transition_to(terminal));
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(Active));
        }
        assert!(!Init.can_transition_to(Active));
        assert!(!Active.can_transition_to(Open));
        assert!(!Open.can_transition_to(Expired));
    }

    #[test]
    fn test_end_reason_states() {
        assert_eq!(EndReason::ClientClosed.terminal_state(), SessionState::Closed);
        assert_eq!(EndReason::MaxAgeReached.terminal_state(), SessionState::Expired);
        assert_eq!(EndReason::KeepAliveTimeout.terminal_state(), SessionState::Failed);
        assert_eq!(
            EndReason::Transport("closed".to_string()).terminal_state(),
            SessionState::Failed
        );
    }
}
