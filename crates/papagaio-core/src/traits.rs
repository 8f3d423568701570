use crate::{
    error::BotError,
    message::{InboundMessage, OutboundPayload, Presence, SessionEvent},
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A live messaging session. Replies leave the process only through it.
///
/// One instance exists per connection; the supervisor drops it and asks the
/// [`Connector`] for a fresh one after every retryable disconnect.
#[async_trait]
pub trait Session: Send + Sync {
    /// Subscribe to the presence of a chat so presence updates are delivered.
    async fn subscribe_presence(&self, jid: &str) -> Result<(), BotError>;

    /// Announce a chat state (composing, recording, paused) to a chat.
    async fn send_presence(&self, jid: &str, presence: Presence) -> Result<(), BotError>;

    /// Mark an inbound message as read.
    async fn mark_read(&self, message: &InboundMessage) -> Result<(), BotError>;

    /// Deliver a payload. Returns the platform message id when one is assigned.
    async fn send(&self, jid: &str, payload: OutboundPayload) -> Result<Option<String>, BotError>;

    /// Tear the connection down. Called before a replacement session is started.
    async fn close(&self) -> Result<(), BotError> {
        Ok(())
    }
}

/// A freshly bootstrapped session plus the stream of its events.
///
/// The queue is unbounded so producers never yield while forwarding, which
/// keeps events in the order the platform delivered them.
pub struct SessionHandle {
    pub session: Arc<dyn Session>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Session bootstrap. Every call starts a brand-new session.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<SessionHandle, BotError>;
}

/// Text-to-speech backend writing the synthesized audio to a file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return the path of the written audio file.
    async fn synthesize(&self, text: &str) -> Result<PathBuf, BotError>;

    /// Where synthesized audio is written, whether or not the last call succeeded.
    fn output_path(&self) -> PathBuf;
}

/// Source of random pictures written to a file.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download one random image and return the path it was written to.
    async fn fetch_random(&self) -> Result<PathBuf, BotError>;
}
