//! Reconnection policy: the connection state machine driven by session updates.
//!
//! Every closure except a logout restarts the session immediately. There is
//! no backoff and no attempt cap.

use crate::message::{ConnectionUpdate, DisconnectReason};
use tracing::{info, warn};

/// Where the current session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    ClosedRetryable,
    /// Terminal. The credentials were revoked.
    ClosedLoggedOut,
}

/// What the supervisor should do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep pumping events from the current session.
    Continue,
    /// Drop the current session and bootstrap a new one.
    Restart,
    /// Stop for good.
    Stop,
}

#[derive(Debug)]
pub struct ReconnectPolicy {
    state: ConnectionState,
    restarts: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            restarts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of restarts requested so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    pub fn is_terminal(&self) -> bool {
        self.state == ConnectionState::ClosedLoggedOut
    }

    /// A replacement session is being bootstrapped.
    pub fn begin_connect(&mut self) {
        if !self.is_terminal() {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Apply a lifecycle update and decide the next step.
    pub fn on_update(&mut self, update: &ConnectionUpdate) -> Action {
        if self.is_terminal() {
            return Action::Stop;
        }

        match update {
            ConnectionUpdate::Connecting => {
                self.state = ConnectionState::Connecting;
                Action::Continue
            }
            ConnectionUpdate::Open => {
                info!("session open");
                self.state = ConnectionState::Open;
                Action::Continue
            }
            ConnectionUpdate::Closed(DisconnectReason::LoggedOut) => {
                warn!("session logged out; not reconnecting");
                self.state = ConnectionState::ClosedLoggedOut;
                Action::Stop
            }
            ConnectionUpdate::Closed(DisconnectReason::Other(reason)) => {
                self.restarts += 1;
                warn!(
                    "session closed ({reason}); restarting (restart #{})",
                    self.restarts
                );
                self.state = ConnectionState::ClosedRetryable;
                Action::Restart
            }
        }
    }

    /// The event stream ended without a close update.
    pub fn on_stream_end(&mut self) -> Action {
        self.on_update(&ConnectionUpdate::Closed(DisconnectReason::Other(
            "event stream ended".to_string(),
        )))
    }
}
