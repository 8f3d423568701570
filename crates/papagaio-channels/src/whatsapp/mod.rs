//! WhatsApp session adapter over `whatsapp-rust`.
//!
//! Speaks the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning the QR code printed to the terminal. The
//! credential state is persisted through [`JsonCredentialStore`](crate::JsonCredentialStore).
//!
//! The library delivers each event from a task of its own. Forwarding never
//! yields, so on a current-thread runtime the session queue sees events in
//! delivery order. `connect()` refuses to start on any other runtime.
//!
//! Without the `whatsapp-web` feature the connector still exists but every
//! `connect()` fails, so the rest of the bot builds and tests without the
//! protocol stack.

#[cfg(feature = "whatsapp-web")]
mod events;
#[cfg(feature = "whatsapp-web")]
mod nodes;
#[cfg(feature = "whatsapp-web")]
mod session;


use papagaio_core::{
    config::Config,
    error::BotError,
    message::{ConnectionUpdate, DisconnectReason, SessionEvent},
};
use std::path::{Path, PathBuf};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

#[cfg(not(feature = "whatsapp-web"))]
use async_trait::async_trait;
#[cfg(not(feature = "whatsapp-web"))]
use papagaio_core::traits::{Connector, SessionHandle};

/// Bootstraps fresh WhatsApp sessions from the persisted credentials.
pub struct WhatsAppConnector {
    auth_path: PathBuf,
    client_name: String,
    display_name: String,
}

impl WhatsAppConnector {
    pub fn new(
        auth_path: impl Into<PathBuf>,
        client_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            auth_path: auth_path.into(),
            client_name: client_name.into(),
            display_name: display_name.into(),
        }
    }

    /// Credentials file and device names taken from the resolved config.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.auth_path(),
            cfg.bot.client_name.clone(),
            cfg.bot.display_name.clone(),
        )
    }

    pub fn auth_path(&self) -> &Path {
        &self.auth_path
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Name shown under Linked Devices on the phone, e.g. `Chrome (chatbot)`.
    pub fn device_os_name(&self) -> String {
        format!("{} ({})", self.display_name, self.client_name)
    }
}

#[cfg(not(feature = "whatsapp-web"))]
#[async_trait]
impl Connector for WhatsAppConnector {
    async fn connect(&self) -> Result<SessionHandle, BotError> {
        require_ordered_runtime()?;
        Err(BotError::Session(
            "built without the `whatsapp-web` feature".into(),
        ))
    }
}

#[cfg_attr(not(feature = "whatsapp-web"), allow(dead_code))]
pub(crate) fn closed(reason: DisconnectReason) -> SessionEvent {
    SessionEvent::Connection(ConnectionUpdate::Closed(reason))
}

/// Fail unless the caller runs on a current-thread tokio runtime.
pub(crate) fn require_ordered_runtime() -> Result<(), BotError> {
    match Handle::try_current().map(|h| h.runtime_flavor()) {
        Ok(RuntimeFlavor::CurrentThread) => Ok(()),
        _ => Err(BotError::Session(
            "whatsapp sessions need a current-thread tokio runtime to keep event order".into(),
        )),
    }
}

/// Queue one event for the supervisor without yielding.
#[cfg_attr(not(feature = "whatsapp-web"), allow(dead_code))]
pub(crate) fn forward(events: &UnboundedSender<SessionEvent>, event: SessionEvent) {
    if events.send(event).is_err() {
        debug!("session event receiver dropped");
    }
}

/// Report the end of the protocol task as a retryable close.
///
/// The library stops its own task after terminal events such as a replaced
/// stream. The event handler keeps a sender alive, so the queue would never
/// end on its own. Returns the handle `close()` aborts with;
/// an aborted task reports nothing.
#[cfg_attr(not(feature = "whatsapp-web"), allow(dead_code))]
pub(crate) fn watch_runner(
    runner: JoinHandle<()>,
    events: UnboundedSender<SessionEvent>,
) -> AbortHandle {
    let abort = runner.abort_handle();
    tokio::spawn(async move {
        let reason = match runner.await {
            Ok(()) => "session task exited".to_string(),
            Err(e) if e.is_cancelled() => return,
            Err(e) => format!("session task failed: {e}"),
        };
        warn!("whatsapp {reason}");
        forward(&events, closed(DisconnectReason::Other(reason)));
    });
    abort
}

/// MIME type of an image from its leading bytes. Defaults to JPEG.
#[cfg_attr(not(feature = "whatsapp-web"), allow(dead_code))]
pub(crate) fn image_mimetype(bytes: &[u8]) -> &'static str {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G'];
    const GIF: &[u8] = b"GIF8";
    if bytes.starts_with(PNG) {
        "image/png"
    } else if bytes.starts_with(GIF) {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
