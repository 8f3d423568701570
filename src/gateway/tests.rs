use super::*;
use async_trait::async_trait;
use papagaio_core::{
    config::{LocationConfig, ReplyConfig},
    message::{
        ConnectionUpdate, DisconnectReason, InboundBatch, InboundMessage, OutboundPayload,
        Presence, UpsertKind,
    },
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Instant;

// --- Mocks ---

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Subscribe(String),
    Presence(String, Presence),
    Read(String),
    Send(String, OutboundPayload),
    Close,
}

/// Records every session call with the (paused) clock offset it happened at.
struct RecordingSession {
    start: Instant,
    ops: Arc<Mutex<Vec<(Duration, Op)>>>,
}

impl RecordingSession {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            ops: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_log(ops: Arc<Mutex<Vec<(Duration, Op)>>>) -> Self {
        Self {
            start: Instant::now(),
            ops,
        }
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push((self.start.elapsed(), op));
    }

    fn ops(&self) -> Vec<(Duration, Op)> {
        self.ops.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for RecordingSession {
    async fn subscribe_presence(&self, jid: &str) -> Result<(), BotError> {
        self.record(Op::Subscribe(jid.into()));
        Ok(())
    }

    async fn send_presence(&self, jid: &str, presence: Presence) -> Result<(), BotError> {
        self.record(Op::Presence(jid.into(), presence));
        Ok(())
    }

    async fn mark_read(&self, message: &InboundMessage) -> Result<(), BotError> {
        self.record(Op::Read(message.id.clone()));
        Ok(())
    }

    async fn send(&self, jid: &str, payload: OutboundPayload) -> Result<Option<String>, BotError> {
        self.record(Op::Send(jid.into(), payload));
        Ok(Some("3EB0SENT".into()))
    }

    async fn close(&self) -> Result<(), BotError> {
        self.record(Op::Close);
        Ok(())
    }
}

/// Hands out scripted integer draws; units are fixed.
struct Scripted {
    below: VecDeque<usize>,
    unit: f64,
}

impl Scripted {
    fn new(below: &[usize]) -> Self {
        Self {
            below: below.iter().copied().collect(),
            unit: 0.5,
        }
    }
}

impl Chance for Scripted {
    fn below(&mut self, n: usize) -> usize {
        let v = self.below.pop_front().unwrap_or(0);
        assert!(v < n, "scripted draw {v} out of range 0..{n}");
        v
    }

    fn unit(&mut self) -> f64 {
        self.unit
    }
}

struct StubSpeech {
    output: PathBuf,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    async fn synthesize(&self, _text: &str) -> Result<PathBuf, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(BotError::Media("tts endpoint error 500".into()))
        } else {
            Ok(self.output.clone())
        }
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone()
    }
}

struct StubImages {
    fail: bool,
}

#[async_trait]
impl ImageSource for StubImages {
    async fn fetch_random(&self) -> Result<PathBuf, BotError> {
        if self.fail {
            Err(BotError::Media("image endpoint error 503".into()))
        } else {
            Ok(PathBuf::from("Media/image.png"))
        }
    }
}

/// Each connect pops the next event script; the channel closes after it
/// unless the connector holds its senders open.
struct ScriptedConnector {
    scripts: Mutex<VecDeque<Vec<SessionEvent>>>,
    connects: AtomicUsize,
    ops: Arc<Mutex<Vec<(Duration, Op)>>>,
    held: Option<Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>>,
}

impl ScriptedConnector {
    fn new(scripts: Vec<Vec<SessionEvent>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            connects: AtomicUsize::new(0),
            ops: Arc::new(Mutex::new(Vec::new())),
            held: None,
        }
    }

    /// Sessions stay open after their script, like a quiet live connection.
    fn held_open(scripts: Vec<Vec<SessionEvent>>) -> Self {
        Self {
            held: Some(Mutex::new(Vec::new())),
            ..Self::new(scripts)
        }
    }

    fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().iter().map(|(_, op)| op.clone()).collect()
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<SessionHandle, BotError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BotError::Session("no more scripted sessions".into()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        for event in script {
            tx.send(event).unwrap();
        }
        if let Some(held) = &self.held {
            held.lock().unwrap().push(tx);
        }
        Ok(SessionHandle {
            session: Arc::new(RecordingSession::with_log(self.ops.clone())),
            events: rx,
        })
    }
}

// --- Helpers ---

const CHAT: &str = "5511999990000@s.whatsapp.net";

fn incoming() -> InboundMessage {
    InboundMessage {
        id: "3EB0INBOUND".into(),
        chat: CHAT.into(),
        sender: CHAT.into(),
        from_me: false,
    }
}

fn corpus_file(dir: &Path, body: &str) -> String {
    let path = dir.join("phrase.txt");
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

struct Setup {
    connector: Arc<dyn Connector>,
    speech_fails: bool,
    images_fail: bool,
    draws: Vec<usize>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            connector: Arc::new(ScriptedConnector::new(Vec::new())),
            speech_fails: false,
            images_fail: false,
            draws: Vec::new(),
        }
    }
}

fn gateway(corpus_path: String, setup: Setup) -> Gateway {
    let reply = ReplyConfig {
        corpus_path,
        ..ReplyConfig::default()
    };
    Gateway::new(
        setup.connector,
        Arc::new(StubSpeech {
            output: PathBuf::from("Media/audio.mp3"),
            fail: setup.speech_fails,
            calls: AtomicUsize::new(0),
        }),
        Arc::new(StubImages {
            fail: setup.images_fail,
        }),
        Box::new(Scripted::new(&setup.draws)),
        &reply,
        LocationConfig::default(),
    )
}

fn single_phrase_gateway(dir: &Path, phrase: &str, modality: usize) -> Gateway {
    gateway(
        corpus_file(dir, phrase),
        Setup {
            // Phrase index (single line), then modality.
            draws: vec![0, modality],
            ..Setup::default()
        },
    )
}

fn closed_other() -> SessionEvent {
    SessionEvent::Connection(ConnectionUpdate::Closed(DisconnectReason::Other(
        "connection lost".into(),
    )))
}

fn logged_out() -> SessionEvent {
    SessionEvent::Connection(ConnectionUpdate::Closed(DisconnectReason::LoggedOut))
}

fn open() -> SessionEvent {
    SessionEvent::Connection(ConnectionUpdate::Open)
}

// --- Routing ---

#[tokio::test(start_paused = true)]
async fn test_text_reply_is_paced() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "oi tudo bem", 0);
    let session = RecordingSession::new();

    let sent = gw
        .handle_batch(&session, &InboundBatch::notify(incoming()))
        .await
        .unwrap();
    assert_eq!(sent, Some("text"));

    let ms = Duration::from_millis;
    assert_eq!(
        session.ops(),
        vec![
            (ms(0), Op::Read("3EB0INBOUND".into())),
            (ms(0), Op::Subscribe(CHAT.into())),
            (ms(500), Op::Presence(CHAT.into(), Presence::Composing)),
            (ms(2000), Op::Presence(CHAT.into(), Presence::Paused)),
            (
                ms(2000),
                Op::Send(
                    CHAT.into(),
                    OutboundPayload::Text {
                        text: "oi tudo bem".into()
                    }
                )
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_self_sent_message_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "oi", 0);
    let session = RecordingSession::new();

    let mut msg = incoming();
    msg.from_me = true;
    let sent = gw
        .handle_batch(&session, &InboundBatch::notify(msg))
        .await
        .unwrap();
    assert_eq!(sent, None);
    assert!(session.ops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_history_batch_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "oi", 0);
    let session = RecordingSession::new();

    let batch = InboundBatch {
        kind: UpsertKind::Append,
        messages: vec![incoming()],
    };
    assert_eq!(gw.handle_batch(&session, &batch).await.unwrap(), None);
    assert!(session.ops().is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "oi", 0);
    let session = RecordingSession::new();
    let batch = InboundBatch {
        kind: UpsertKind::Notify,
        messages: Vec::new(),
    };
    assert_eq!(gw.handle_batch(&session, &batch).await.unwrap(), None);
    assert!(session.ops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_only_first_message_of_batch_is_answered() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "oi", 0);
    let session = RecordingSession::new();

    let mut second = incoming();
    second.id = "3EB0SECOND".into();
    let batch = InboundBatch {
        kind: UpsertKind::Notify,
        messages: vec![incoming(), second],
    };
    gw.handle_batch(&session, &batch).await.unwrap();

    let reads: Vec<_> = session
        .ops()
        .into_iter()
        .filter_map(|(_, op)| match op {
            Op::Read(id) => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(reads, vec!["3EB0INBOUND".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_audio_reply_uses_recording_and_voice_note() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "um dois", 1);
    let session = RecordingSession::new();

    let sent = gw
        .handle_batch(&session, &InboundBatch::notify(incoming()))
        .await
        .unwrap();
    assert_eq!(sent, Some("audio"));

    let ops = session.ops();
    assert!(ops.contains(&(
        Duration::from_millis(500),
        Op::Presence(CHAT.into(), Presence::Recording)
    )));
    let (at, last) = ops.last().unwrap().clone();
    assert_eq!(at, Duration::from_millis(1500));
    assert_eq!(
        last,
        Op::Send(
            CHAT.into(),
            OutboundPayload::Audio {
                path: PathBuf::from("Media/audio.mp3"),
                mimetype: "audio/mp4".into(),
                ptt: true,
            }
        )
    );
}

#[tokio::test(start_paused = true)]
async fn test_audio_still_sent_when_synthesis_fails() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(
        corpus_file(dir.path(), "tchau"),
        Setup {
            speech_fails: true,
            draws: vec![0, 1],
            ..Setup::default()
        },
    );
    let session = RecordingSession::new();

    let sent = gw
        .handle_batch(&session, &InboundBatch::notify(incoming()))
        .await
        .unwrap();
    assert_eq!(sent, Some("audio"));
    assert!(matches!(
        session.ops().last(),
        Some((_, Op::Send(_, OutboundPayload::Audio { .. })))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_image_reply() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "olha isso", 2);
    let session = RecordingSession::new();

    let sent = gw
        .handle_batch(&session, &InboundBatch::notify(incoming()))
        .await
        .unwrap();
    assert_eq!(sent, Some("image"));
    assert_eq!(
        session.ops().last().unwrap().1,
        Op::Send(
            CHAT.into(),
            OutboundPayload::Image {
                path: PathBuf::from("Media/image.png")
            }
        )
    );
}

#[tokio::test(start_paused = true)]
async fn test_image_failure_propagates_without_sending() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(
        corpus_file(dir.path(), "olha isso"),
        Setup {
            images_fail: true,
            draws: vec![0, 2],
            ..Setup::default()
        },
    );
    let session = RecordingSession::new();

    let err = gw
        .handle_batch(&session, &InboundBatch::notify(incoming()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
    // Already marked read; nothing else happened.
    assert_eq!(session.ops().len(), 1);
    assert!(matches!(session.ops()[0].1, Op::Read(_)));
}

#[tokio::test(start_paused = true)]
async fn test_location_reply_within_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let gw = single_phrase_gateway(dir.path(), "estou aqui agora", 3);
    let session = RecordingSession::new();

    let sent = gw
        .handle_batch(&session, &InboundBatch::notify(incoming()))
        .await
        .unwrap();
    assert_eq!(sent, Some("location"));

    let (at, last) = session.ops().last().unwrap().clone();
    assert_eq!(at, Duration::from_millis(2000));
    match last {
        Op::Send(jid, OutboundPayload::Location { latitude, longitude }) => {
            assert_eq!(jid, CHAT);
            assert!((-180.0..=180.0).contains(&latitude));
            assert!((-180.0..=180.0).contains(&longitude));
        }
        other => panic!("expected a location send, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_corpus_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(
        dir.path().join("absent.txt").to_string_lossy().into_owned(),
        Setup::default(),
    );
    let session = RecordingSession::new();
    let result = gw
        .handle_batch(&session, &InboundBatch::notify(incoming()))
        .await;
    assert!(result.is_err());
    assert!(session.ops().is_empty());
}

// --- Supervision ---

#[tokio::test(start_paused = true)]
async fn test_retryable_close_reconnects_once() {
    let connector = Arc::new(ScriptedConnector::new(vec![
        vec![open(), closed_other()],
        vec![open(), logged_out()],
    ]));
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(
        corpus_file(dir.path(), "oi"),
        Setup {
            connector: connector.clone(),
            ..Setup::default()
        },
    );

    let policy = gw.supervise().await.unwrap();
    assert_eq!(connector.connects(), 2);
    assert_eq!(policy.restarts(), 1);
    assert!(policy.is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_logout_never_reconnects() {
    let connector = Arc::new(ScriptedConnector::new(vec![
        vec![open(), logged_out()],
        vec![open()],
    ]));
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(
        corpus_file(dir.path(), "oi"),
        Setup {
            connector: connector.clone(),
            ..Setup::default()
        },
    );

    let policy = gw.supervise().await.unwrap();
    assert_eq!(connector.connects(), 1);
    assert_eq!(policy.restarts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_counts_as_retryable_close() {
    let connector = Arc::new(ScriptedConnector::new(vec![
        vec![open()],
        vec![logged_out()],
    ]));
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(
        corpus_file(dir.path(), "oi"),
        Setup {
            connector: connector.clone(),
            ..Setup::default()
        },
    );

    let policy = gw.supervise().await.unwrap();
    assert_eq!(connector.connects(), 2);
    assert_eq!(policy.restarts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_replaced_session_is_closed() {
    let connector = Arc::new(ScriptedConnector::new(vec![
        vec![closed_other()],
        vec![logged_out()],
    ]));
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(
        corpus_file(dir.path(), "oi"),
        Setup {
            connector: connector.clone(),
            ..Setup::default()
        },
    );

    gw.supervise().await.unwrap();
    let closes = connector
        .ops
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, op)| *op == Op::Close)
        .count();
    assert_eq!(closes, 2);
}

#[tokio::test(start_paused = true)]
async fn test_reply_failure_keeps_session_running() {
    let dir = tempfile::tempdir().unwrap();
    let connector = Arc::new(ScriptedConnector::new(vec![vec![
        open(),
        SessionEvent::Inbound(InboundBatch::notify(incoming())),
        SessionEvent::Inbound(InboundBatch::notify(incoming())),
        logged_out(),
    ]]));
    // Corpus file is missing: both replies fail, the loop goes on.
    let gw = gateway(
        dir.path().join("absent.txt").to_string_lossy().into_owned(),
        Setup {
            connector: connector.clone(),
            ..Setup::default()
        },
    );

    let policy = gw.supervise().await.unwrap();
    assert!(policy.is_terminal());
    assert_eq!(connector.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_inbound_events_are_answered_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = incoming();
    first.id = "A".into();
    let mut second = incoming();
    second.id = "B".into();
    let connector = Arc::new(ScriptedConnector::new(vec![vec![
        open(),
        SessionEvent::Inbound(InboundBatch::notify(first)),
        SessionEvent::Inbound(InboundBatch::notify(second)),
        logged_out(),
    ]]));
    let gw = gateway(
        corpus_file(dir.path(), "resposta"),
        Setup {
            connector: connector.clone(),
            // phrase, modality (text) for each message
            draws: vec![0, 0, 0, 0],
            ..Setup::default()
        },
    );

    gw.supervise().await.unwrap();
    let ops = connector.ops();
    let read_a = ops.iter().position(|op| *op == Op::Read("A".into())).unwrap();
    let read_b = ops.iter().position(|op| *op == Op::Read("B".into())).unwrap();
    let first_send = ops
        .iter()
        .position(|op| matches!(op, Op::Send(..)))
        .unwrap();
    assert!(read_a < first_send && first_send < read_b);
}

#[tokio::test]
async fn test_connect_failure_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(corpus_file(dir.path(), "oi"), Setup::default());
    assert!(matches!(gw.supervise().await, Err(BotError::Session(_))));
}

// --- Shutdown ---

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_live_session() {
    let dir = tempfile::tempdir().unwrap();
    let connector = Arc::new(ScriptedConnector::held_open(vec![vec![
        open(),
        SessionEvent::Inbound(InboundBatch::notify(incoming())),
    ]]));
    let gw = gateway(
        corpus_file(dir.path(), "uma resposta bem demorada"),
        Setup {
            connector: connector.clone(),
            draws: vec![0, 0],
            ..Setup::default()
        },
    );

    // Stop while the text reply is still typing.
    gw.run_until(tokio::time::sleep(Duration::from_millis(1000)))
        .await
        .unwrap();

    let ops = connector.ops();
    assert_eq!(connector.connects(), 1);
    assert!(ops.contains(&Op::Presence(CHAT.into(), Presence::Composing)));
    assert!(!ops.iter().any(|op| matches!(op, Op::Send(..))));
    assert_eq!(ops.last(), Some(&Op::Close));
}

#[tokio::test(start_paused = true)]
async fn test_logout_ends_run_without_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let connector = Arc::new(ScriptedConnector::new(vec![vec![open(), logged_out()]]));
    let gw = gateway(
        corpus_file(dir.path(), "oi"),
        Setup {
            connector: connector.clone(),
            ..Setup::default()
        },
    );

    gw.run_until(std::future::pending()).await.unwrap();
    let closes = connector.ops().iter().filter(|op| **op == Op::Close).count();
    assert_eq!(closes, 1);
}
