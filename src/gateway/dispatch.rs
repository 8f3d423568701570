//! Reply dispatch with human-like pacing.
//!
//! Every send follows the same ritual: subscribe to the chat's presence,
//! settle, show composing (or recording), wait out the delay, pause, send.

use super::Gateway;
use papagaio_core::{
    error::BotError,
    message::{OutboundPayload, Presence},
    traits::Session,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Voice notes are announced as `audio/mp4` regardless of the file's container.
pub(super) const VOICE_MIMETYPE: &str = "audio/mp4";

impl Gateway {
    async fn paced_send(
        &self,
        session: &dyn Session,
        jid: &str,
        indicator: Presence,
        delay: Duration,
        payload: OutboundPayload,
    ) -> Result<Option<String>, BotError> {
        session.subscribe_presence(jid).await?;
        tokio::time::sleep(self.settle).await;

        session.send_presence(jid, indicator).await?;
        tokio::time::sleep(delay).await;

        session.send_presence(jid, Presence::Paused).await?;
        debug!("sending {} to {jid} after {delay:?}", payload.modality());
        session.send(jid, payload).await
    }

    pub(super) async fn send_text(
        &self,
        session: &dyn Session,
        jid: &str,
        text: String,
        delay: Duration,
    ) -> Result<Option<String>, BotError> {
        self.paced_send(
            session,
            jid,
            Presence::Composing,
            delay,
            OutboundPayload::Text { text },
        )
        .await
    }

    /// Send the audio file as a push-to-talk voice note.
    pub(super) async fn send_audio(
        &self,
        session: &dyn Session,
        jid: &str,
        path: PathBuf,
        delay: Duration,
    ) -> Result<Option<String>, BotError> {
        let payload = OutboundPayload::Audio {
            path,
            mimetype: VOICE_MIMETYPE.to_string(),
            ptt: true,
        };
        self.paced_send(session, jid, Presence::Recording, delay, payload)
            .await
    }

    pub(super) async fn send_image(
        &self,
        session: &dyn Session,
        jid: &str,
        path: PathBuf,
        delay: Duration,
    ) -> Result<Option<String>, BotError> {
        self.paced_send(
            session,
            jid,
            Presence::Composing,
            delay,
            OutboundPayload::Image { path },
        )
        .await
    }

    pub(super) async fn send_location(
        &self,
        session: &dyn Session,
        jid: &str,
        latitude: f64,
        longitude: f64,
        delay: Duration,
    ) -> Result<(), BotError> {
        self.paced_send(
            session,
            jid,
            Presence::Composing,
            delay,
            OutboundPayload::Location {
                latitude,
                longitude,
            },
        )
        .await?;
        Ok(())
    }
}
