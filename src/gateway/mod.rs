//! Gateway: the session supervisor and the auto-reply pipeline.
//!
//! One session is live at a time. Its events are handled strictly in arrival
//! order: every reply finishes (delays included) before the next event is read.

mod dispatch;
mod routing;

#[cfg(test)]
mod tests;

use papagaio_core::{
    chance::Chance,
    config::{LocationConfig, ReplyConfig},
    error::BotError,
    lifecycle::{Action, ReconnectPolicy},
    message::SessionEvent,
    phrase::PhraseSource,
    traits::{Connector, ImageSource, Session, SessionHandle, SpeechSynthesizer},
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Supervises the session and answers every inbound message.
pub struct Gateway {
    pub(super) connector: Arc<dyn Connector>,
    pub(super) phrases: PhraseSource,
    pub(super) speech: Arc<dyn SpeechSynthesizer>,
    pub(super) images: Arc<dyn ImageSource>,
    /// Never held across an await.
    pub(super) chance: Mutex<Box<dyn Chance>>,
    pub(super) settle: Duration,
    pub(super) ms_per_word: u64,
    pub(super) location: LocationConfig,
    /// The live session, kept so shutdown can close it.
    current: Mutex<Option<Arc<dyn Session>>>,
}

impl Gateway {
    pub fn new(
        connector: Arc<dyn Connector>,
        speech: Arc<dyn SpeechSynthesizer>,
        images: Arc<dyn ImageSource>,
        chance: Box<dyn Chance>,
        reply: &ReplyConfig,
        location: LocationConfig,
    ) -> Self {
        Self {
            connector,
            phrases: PhraseSource::new(&reply.corpus_path),
            speech,
            images,
            chance: Mutex::new(chance),
            settle: Duration::from_millis(reply.settle_ms),
            ms_per_word: reply.ms_per_word,
            location,
            current: Mutex::new(None),
        }
    }

    /// Run until the session is logged out or Ctrl-C is received.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("listening for Ctrl-C failed: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until logout or until `shutdown` completes.
    ///
    /// On shutdown any reply in flight is abandoned and the live session is
    /// closed before returning.
    pub(crate) async fn run_until(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tokio::select! {
            result = self.supervise() => {
                let policy = result?;
                info!(
                    "session ended after {} restart(s); re-pair to continue",
                    policy.restarts()
                );
            }
            _ = shutdown => {
                info!("Received shutdown signal");
                self.close_current().await;
            }
        }
        Ok(())
    }

    /// Bootstrap sessions until the policy says stop.
    ///
    /// A retryable close replaces the session immediately. Connect failures
    /// are returned to the caller.
    pub(crate) async fn supervise(&self) -> Result<ReconnectPolicy, BotError> {
        let mut policy = ReconnectPolicy::new();
        loop {
            policy.begin_connect();
            let SessionHandle {
                session,
                mut events,
            } = self.connector.connect().await?;
            *self.current_slot() = Some(session.clone());

            let action = self.pump(session.as_ref(), &mut events, &mut policy).await;

            self.current_slot().take();
            if let Err(e) = session.close().await {
                warn!("closing session failed: {e}");
            }
            if action == Action::Stop {
                return Ok(policy);
            }
        }
    }

    /// Handle one session's events until its lifecycle asks for a change.
    async fn pump(
        &self,
        session: &dyn Session,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
        policy: &mut ReconnectPolicy,
    ) -> Action {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Connection(update) => match policy.on_update(&update) {
                    Action::Continue => {}
                    action => return action,
                },
                SessionEvent::Inbound(batch) => {
                    if let Err(e) = self.handle_batch(session, &batch).await {
                        error!("auto-reply failed: {e}");
                    }
                }
            }
        }
        policy.on_stream_end()
    }

    async fn close_current(&self) {
        let session = self.current_slot().take();
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                warn!("closing session on shutdown failed: {e}");
            }
        }
    }

    fn current_slot(&self) -> MutexGuard<'_, Option<Arc<dyn Session>>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn chance(&self) -> MutexGuard<'_, Box<dyn Chance>> {
        self.chance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
