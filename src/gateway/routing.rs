//! Per-batch reply decision: which phrase, which modality.

use super::Gateway;
use papagaio_core::{
    delay::compute_delay_with,
    error::BotError,
    location::random_coordinate,
    message::{InboundBatch, UpsertKind},
    traits::Session,
};
use tracing::{info, warn};

/// Number of reply modalities: text, audio, image, location.
const MODALITIES: usize = 4;

impl Gateway {
    /// Answer the first message of a live batch from someone else.
    ///
    /// Returns the modality that was sent, or `None` when the batch is skipped.
    pub(super) async fn handle_batch(
        &self,
        session: &dyn Session,
        batch: &InboundBatch,
    ) -> Result<Option<&'static str>, BotError> {
        let Some(message) = batch.messages.first() else {
            return Ok(None);
        };
        if message.from_me || batch.kind != UpsertKind::Notify {
            return Ok(None);
        }
        let jid = message.chat.as_str();

        let corpus = self.phrases.read().await?;
        let phrase = corpus.choose(self.chance().as_mut()).to_string();
        let delay = compute_delay_with(&phrase, self.ms_per_word);

        session.mark_read(message).await?;

        let choice = self.chance().below(MODALITIES);
        info!("replying to {} in {jid} (choice {choice})", message.sender);

        let modality = match choice {
            0 => {
                self.send_text(session, jid, phrase, delay).await?;
                "text"
            }
            1 => {
                // A stale file from an earlier reply is sent when synthesis fails.
                let path = match self.speech.synthesize(&phrase).await {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("speech synthesis failed, sending previous audio: {e}");
                        self.speech.output_path()
                    }
                };
                self.send_audio(session, jid, path, delay).await?;
                "audio"
            }
            2 => {
                let path = self.images.fetch_random().await?;
                self.send_image(session, jid, path, delay).await?;
                "image"
            }
            _ => {
                let point = random_coordinate(self.chance().as_mut(), &self.location);
                self.send_location(session, jid, point.latitude, point.longitude, delay)
                    .await?;
                "location"
            }
        };
        Ok(Some(modality))
    }
}
