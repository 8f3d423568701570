//! Translation of `whatsapp-rust` events into session events.

use super::closed;
use papagaio_core::message::{
    ConnectionUpdate, DisconnectReason, InboundBatch, InboundMessage, SessionEvent,
};
use tracing::{debug, error, info, warn};
use wacore::types::events::Event;
use wacore::types::message::MessageInfo;

/// What the event handler should do with one library event.
#[derive(Debug)]
pub(super) enum Translated {
    Forward(SessionEvent),
    /// Pairing QR payload to show the user.
    PairingQr(String),
    Ignore,
}

/// Map a library event onto the bot's event model.
///
/// Live `Message` events are always notifications; history sync arrives
/// through separate events that are not forwarded. Every event after which
/// the library stops reconnecting on its own becomes a `Closed` update.
pub(super) fn translate(event: Event) -> Translated {
    match event {
        Event::Message(_, info) => {
            let inbound = to_inbound(&info);
            debug!(
                "inbound {} from {} in {} (from_me={})",
                inbound.id, inbound.sender, inbound.chat, inbound.from_me
            );
            Translated::Forward(SessionEvent::Inbound(InboundBatch::notify(inbound)))
        }
        Event::Connected(_) => {
            info!("whatsapp connected");
            Translated::Forward(SessionEvent::Connection(ConnectionUpdate::Open))
        }
        Event::PairSuccess(_) => {
            info!("whatsapp pairing successful");
            Translated::Ignore
        }
        Event::Disconnected(_) => {
            warn!("whatsapp disconnected");
            Translated::Forward(closed(DisconnectReason::Other("disconnected".into())))
        }
        Event::StreamError(e) => {
            error!("whatsapp stream error: {e:?}");
            Translated::Forward(closed(DisconnectReason::Other(format!("stream error: {e:?}"))))
        }
        Event::StreamReplaced(_) => {
            warn!("whatsapp stream replaced by another connection");
            Translated::Forward(closed(DisconnectReason::Other("stream replaced".into())))
        }
        Event::ClientOutdated(_) => {
            error!("whatsapp rejected the client version as outdated");
            Translated::Forward(closed(DisconnectReason::Other("client outdated".into())))
        }
        Event::TemporaryBan(ban) => {
            error!("whatsapp temporary ban ({}), expires in {:?}", ban.code, ban.expire);
            Translated::Forward(closed(DisconnectReason::Other(format!(
                "temporary ban: {}",
                ban.code
            ))))
        }
        Event::ConnectFailure(failure) if failure.reason.is_logged_out() => {
            warn!("whatsapp connect failure {:?}, session invalidated", failure.reason);
            Translated::Forward(closed(DisconnectReason::LoggedOut))
        }
        Event::ConnectFailure(failure) => {
            error!(
                "whatsapp connect failure {:?}: {}",
                failure.reason, failure.message
            );
            Translated::Forward(closed(DisconnectReason::Other(format!(
                "connect failure: {:?}",
                failure.reason
            ))))
        }
        Event::LoggedOut(_) => {
            warn!("whatsapp logged out, session invalidated");
            Translated::Forward(closed(DisconnectReason::LoggedOut))
        }
        Event::PairingQrCode { code, .. } => Translated::PairingQr(code),
        _ => Translated::Ignore,
    }
}

pub(super) fn to_inbound(info: &MessageInfo) -> InboundMessage {
    InboundMessage {
        id: info.id.clone(),
        chat: info.source.chat.to_string(),
        sender: info.source.sender.to_string(),
        from_me: info.source.is_from_me,
    }
}
