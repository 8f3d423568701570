//! Speech synthesis through the Google Translate web endpoint.
//!
//! Same request the translate.google.com "listen" button issues: a
//! `batchexecute` RPC (`jQ1olc`) answering with a base64 MP3.

use async_trait::async_trait;
use base64::Engine;
use papagaio_core::{config::MediaConfig, error::BotError, traits::SpeechSynthesizer};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Longest text the endpoint accepts in one request.
pub const MAX_CHUNK_CHARS: usize = 200;

const RPC_ID: &str = "jQ1olc";
const RPC_PATH: &str = "/_/TranslateWebserverUi/data/batchexecute";

/// Google Translate text-to-speech writing MP3 to a fixed path.
pub struct GoogleTts {
    http: reqwest::Client,
    host: String,
    lang: String,
    slow: bool,
    split_punct: String,
    output: PathBuf,
}

impl GoogleTts {
    pub fn from_config(cfg: &MediaConfig) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.tts_timeout_secs))
            .build()
            .map_err(|e| BotError::Media(format!("tts http client: {e}")))?;

        Ok(Self {
            http,
            host: cfg.tts_host.trim_end_matches('/').to_string(),
            lang: cfg.tts_lang.clone(),
            slow: cfg.tts_slow,
            split_punct: cfg.tts_split_punct.clone(),
            output: cfg.audio_path(),
        })
    }

    /// Fetch base64 audio for one chunk of at most [`MAX_CHUNK_CHARS`] characters.
    async fn fetch_chunk(&self, text: &str) -> Result<String, BotError> {
        let payload = build_rpc_payload(text, &self.lang, self.slow)?;

        let resp = self
            .http
            .post(format!("{}{RPC_PATH}", self.host))
            .form(&[("f.req", payload)])
            .send()
            .await
            .map_err(|e| BotError::Media(format!("tts request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Media(format!("tts endpoint error {status}: {body}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| BotError::Media(format!("tts response read failed: {e}")))?;

        parse_rpc_response(&body, &self.lang)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<PathBuf, BotError> {
        let chunks = split_long_text(text, MAX_CHUNK_CHARS, &self.split_punct);
        if chunks.is_empty() {
            return Err(BotError::Media("nothing to synthesize".into()));
        }

        let mut audio = Vec::new();
        for chunk in &chunks {
            let encoded = self.fetch_chunk(chunk).await?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| BotError::Media(format!("tts audio is not base64: {e}")))?;
            audio.extend_from_slice(&bytes);
        }
        debug!("synthesized {} chunk(s), {} bytes", chunks.len(), audio.len());

        crate::ensure_parent(&self.output).await?;
        tokio::fs::write(&self.output, &audio).await?;
        info!("wrote speech to {}", self.output.display());
        Ok(self.output.clone())
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone()
    }
}

/// Build the `f.req` form value for the TTS RPC.
pub(crate) fn build_rpc_payload(text: &str, lang: &str, slow: bool) -> Result<String, BotError> {
    let slow = if slow {
        serde_json::Value::Bool(true)
    } else {
        serde_json::Value::Null
    };
    let inner = serde_json::to_string(&serde_json::json!([text, lang, slow, "null"]))?;
    let outer = serde_json::json!([[[RPC_ID, inner, null, "generic"]]]);
    Ok(serde_json::to_string(&outer)?)
}

/// Extract the base64 audio from a `batchexecute` response body.
///
/// The body is an anti-XSSI prefix followed by length-prefixed JSON lines;
/// the `wrb.fr` entry for our RPC carries a JSON-encoded array whose first
/// element is the audio.
pub(crate) fn parse_rpc_response(body: &str, lang: &str) -> Result<String, BotError> {
    for line in body.lines() {
        let line = line.trim();
        if !line.starts_with('[') {
            continue;
        }
        let Ok(serde_json::Value::Array(entries)) = serde_json::from_str::<serde_json::Value>(line)
        else {
            continue;
        };

        for entry in &entries {
            let is_ours = entry.get(0).and_then(|v| v.as_str()) == Some("wrb.fr")
                && entry.get(1).and_then(|v| v.as_str()) == Some(RPC_ID);
            if !is_ours {
                continue;
            }
            let Some(result) = entry.get(2).and_then(|v| v.as_str()) else {
                return Err(BotError::Media(format!(
                    "tts returned no audio; lang \"{lang}\" might not exist"
                )));
            };
            let decoded: serde_json::Value = serde_json::from_str(result)?;
            return decoded
                .get(0)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| BotError::Media("tts result has no audio field".into()));
        }
    }

    Err(BotError::Media("tts response has no audio entry".into()))
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Cuts after the last split punctuation inside the window, else at the
/// last space, else hard at `max_chars`.
pub fn split_long_text(text: &str, max_chars: usize, punct: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_string());
            break;
        }

        // Byte offset just past the `max_chars`-th character.
        let window_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..window_end];

        let cut = window
            .char_indices()
            .filter(|(_, c)| punct.contains(*c))
            .map(|(i, c)| i + c.len_utf8())
            .last()
            .or_else(|| window.rfind(' ').filter(|&i| i > 0))
            .unwrap_or(window_end);

        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    chunks
}
