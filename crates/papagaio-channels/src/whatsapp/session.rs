//! Live `whatsapp-rust` session and its bootstrap.

use super::events::{translate, Translated};
use super::{
    forward, image_mimetype, nodes, require_ordered_runtime, watch_runner, WhatsAppConnector,
};
use crate::{qr, JsonCredentialStore};
use async_trait::async_trait;
use papagaio_core::{
    error::BotError,
    message::{ConnectionUpdate, InboundMessage, OutboundPayload, Presence, SessionEvent},
    traits::{Connector, Session, SessionHandle},
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use wacore_binary::jid::Jid;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

#[async_trait]
impl Connector for WhatsAppConnector {
    async fn connect(&self) -> Result<SessionHandle, BotError> {
        require_ordered_runtime()?;
        info!(
            "whatsapp session starting as '{}' (credentials: {})",
            self.device_os_name(),
            self.auth_path.display()
        );
        let backend = Arc::new(JsonCredentialStore::open(&self.auth_path).await?);

        let (tx, rx) = mpsc::unbounded_channel();
        // The supervisor sees Connecting before anything the bot reports.
        forward(&tx, SessionEvent::Connection(ConnectionUpdate::Connecting));

        let tx_events = tx.clone();
        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_os_info(Some(self.device_os_name()), None)
            .on_event(move |event, _client| {
                // Runs before the first await, so on a current-thread
                // runtime events are queued in delivery order.
                match translate(event) {
                    Translated::Forward(ev) => forward(&tx_events, ev),
                    Translated::PairingQr(code) => show_pairing_qr(&code),
                    Translated::Ignore => {}
                }
                std::future::ready(())
            })
            .build()
            .await
            .map_err(|e| BotError::Session(format!("whatsapp bot build failed: {e}")))?;

        let client = bot.client();
        let runner = bot
            .run()
            .await
            .map_err(|e| BotError::Session(format!("whatsapp bot run failed: {e}")))?;

        let session = WhatsAppSession {
            client,
            runner: Mutex::new(Some(watch_runner(runner, tx))),
        };
        Ok(SessionHandle {
            session: Arc::new(session),
            events: rx,
        })
    }
}

fn show_pairing_qr(code: &str) {
    info!("whatsapp QR code generated (scan with WhatsApp > Linked Devices)");
    match qr::render_terminal(code) {
        Ok(rendered) => {
            eprintln!();
            eprintln!("{rendered}");
        }
        Err(e) => {
            warn!("failed to render pairing QR: {e}");
            info!("QR payload: {code}");
        }
    }
}

/// A running bot plus its client handle.
pub struct WhatsAppSession {
    client: Arc<Client>,
    runner: Mutex<Option<AbortHandle>>,
}

fn parse_jid(jid: &str) -> Result<Jid, BotError> {
    jid.parse()
        .map_err(|e| BotError::Session(format!("invalid whatsapp JID '{jid}': {e}")))
}

impl WhatsAppSession {
    async fn build_message(
        &self,
        payload: OutboundPayload,
    ) -> Result<waproto::whatsapp::Message, BotError> {
        use waproto::whatsapp::message::{AudioMessage, ImageMessage, LocationMessage};
        use waproto::whatsapp::Message;

        let msg = match payload {
            OutboundPayload::Text { text } => Message {
                conversation: Some(text),
                ..Default::default()
            },
            OutboundPayload::Audio {
                path,
                mimetype,
                ptt,
            } => {
                let data = tokio::fs::read(&path).await?;
                let upload = self
                    .client
                    .upload(data, MediaType::Audio)
                    .await
                    .map_err(|e| BotError::Session(format!("whatsapp audio upload failed: {e}")))?;
                Message {
                    audio_message: Some(Box::new(AudioMessage {
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        mimetype: Some(mimetype),
                        ptt: Some(ptt),
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
            OutboundPayload::Image { path } => {
                let data = tokio::fs::read(&path).await?;
                let mimetype = image_mimetype(&data).to_string();
                let upload = self
                    .client
                    .upload(data, MediaType::Image)
                    .await
                    .map_err(|e| BotError::Session(format!("whatsapp image upload failed: {e}")))?;
                Message {
                    image_message: Some(Box::new(ImageMessage {
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        mimetype: Some(mimetype),
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
            OutboundPayload::Location {
                latitude,
                longitude,
            } => Message {
                location_message: Some(Box::new(LocationMessage {
                    degrees_latitude: Some(latitude),
                    degrees_longitude: Some(longitude),
                    ..Default::default()
                })),
                ..Default::default()
            },
        };
        Ok(msg)
    }
}

#[async_trait]
impl Session for WhatsAppSession {
    async fn subscribe_presence(&self, jid: &str) -> Result<(), BotError> {
        let jid = parse_jid(jid)?;
        self.client
            .send_node(nodes::presence_subscribe(&jid))
            .await
            .map_err(|e| BotError::Session(format!("presence subscribe failed: {e}")))
    }

    async fn send_presence(&self, jid: &str, presence: Presence) -> Result<(), BotError> {
        let jid = parse_jid(jid)?;
        let chatstate = self.client.chatstate();
        let result = match presence {
            Presence::Composing => chatstate.send_composing(&jid).await,
            Presence::Recording => chatstate.send_recording(&jid).await,
            Presence::Paused => chatstate.send_paused(&jid).await,
        };
        result.map_err(|e| {
            BotError::Session(format!("chat state {} failed: {e}", presence.as_str()))
        })
    }

    async fn mark_read(&self, message: &InboundMessage) -> Result<(), BotError> {
        let chat = parse_jid(&message.chat)?;
        let sender = parse_jid(&message.sender)?;
        self.client
            .send_node(nodes::read_receipt(&message.id, &chat, &sender))
            .await
            .map_err(|e| BotError::Session(format!("read receipt failed: {e}")))
    }

    async fn send(&self, jid: &str, payload: OutboundPayload) -> Result<Option<String>, BotError> {
        let to = parse_jid(jid)?;
        let modality = payload.modality();
        let msg = self.build_message(payload).await?;
        let id = self
            .client
            .send_message(to, msg)
            .await
            .map_err(|e| BotError::Session(format!("whatsapp {modality} send failed: {e}")))?;
        debug!("sent {modality} {id} to {jid}");
        Ok(Some(id))
    }

    async fn close(&self) -> Result<(), BotError> {
        let runner = self
            .runner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = runner {
            handle.abort();
        }
        self.client.disconnect().await;
        info!("whatsapp session closed");
        Ok(())
    }
}
