use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a batch of messages reached us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    /// Live notification of a freshly received message.
    Notify,
    /// Replayed history (offline sync, backfill). Never answered.
    Append,
}

/// A single inbound chat message, reduced to what the router needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform message id.
    pub id: String,
    /// JID of the chat the message arrived in; replies go here.
    pub chat: String,
    /// JID of the author.
    pub sender: String,
    /// Whether this account sent the message itself.
    pub from_me: bool,
}

/// A batch of inbound messages delivered by the session in one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundBatch {
    pub kind: UpsertKind,
    pub messages: Vec<InboundMessage>,
}

impl InboundBatch {
    /// A live batch holding a single message.
    pub fn notify(message: InboundMessage) -> Self {
        Self {
            kind: UpsertKind::Notify,
            messages: vec![message],
        }
    }
}

/// Presence signal shown to the remote party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Composing,
    Recording,
    Paused,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Composing => "composing",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

/// Reply content handed to the session layer. Built per send and discarded after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundPayload {
    Text {
        text: String,
    },
    Audio {
        path: PathBuf,
        mimetype: String,
        /// Send as a push-to-talk voice note.
        ptt: bool,
    },
    Image {
        path: PathBuf,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
}

impl OutboundPayload {
    /// Short modality name for logs.
    pub fn modality(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Audio { .. } => "audio",
            Self::Image { .. } => "image",
            Self::Location { .. } => "location",
        }
    }
}

/// Why a session connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The linked device was removed from the phone. Credentials are dead.
    LoggedOut,
    /// Anything else: network drop, stream error, replaced stream.
    Other(String),
}

/// Connection lifecycle notifications from the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Connecting,
    Open,
    Closed(DisconnectReason),
}

/// Everything a running session reports to the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Inbound(InboundBatch),
    Connection(ConnectionUpdate),
}
