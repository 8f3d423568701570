//! JSON-file credential store for the WhatsApp session.
//!
//! The whole credential state (device identity, Signal keys, app-state sync
//! keys, LID mappings) lives in one JSON document that is rewritten after
//! every mutation. Byte blobs are hex encoded. With the `whatsapp-web`
//! feature the store implements the `whatsapp-rust` backend traits.

#[cfg(feature = "whatsapp-web")]
mod backend;


use papagaio_core::error::BotError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A one-time prekey and whether the server already has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreKeyEntry {
    pub record: String,
    #[serde(default)]
    pub uploaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncKeyEntry {
    pub key_data: String,
    pub timestamp: i64,
    #[serde(default)]
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationMacEntry {
    pub version: u64,
    pub value_mac: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidMappingEntry {
    pub phone_number: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub learning_source: String,
}

/// Everything persisted for one linked device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthState {
    /// Hex of the bincode-encoded device record; `None` until paired.
    pub device: Option<String>,
    pub identities: BTreeMap<String, String>,
    pub sessions: BTreeMap<String, String>,
    pub prekeys: BTreeMap<u32, PreKeyEntry>,
    pub signed_prekeys: BTreeMap<u32, String>,
    pub sender_keys: BTreeMap<String, String>,
    /// Keyed by hex key id.
    pub app_sync_keys: BTreeMap<String, SyncKeyEntry>,
    pub app_versions: BTreeMap<String, serde_json::Value>,
    /// Collection → hex index MAC → entry.
    pub mutation_macs: BTreeMap<String, BTreeMap<String, MutationMacEntry>>,
    pub skdm_recipients: BTreeMap<String, BTreeSet<String>>,
    /// Keyed by LID user.
    pub lid_mappings: BTreeMap<String, LidMappingEntry>,
    /// Address → message id → hex base key.
    pub base_keys: BTreeMap<String, BTreeMap<String, String>>,
    pub device_lists: BTreeMap<String, serde_json::Value>,
    pub forget_sender_keys: BTreeMap<String, BTreeSet<String>>,
}

impl AuthState {
    /// Whether a paired device identity is stored.
    pub fn is_paired(&self) -> bool {
        self.device.is_some()
    }
}

/// Credential state held in memory and mirrored to a JSON file.
pub struct JsonCredentialStore {
    path: PathBuf,
    state: Mutex<AuthState>,
}

impl JsonCredentialStore {
    /// Load the file at `path`, or start empty when it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, BotError> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: AuthState = serde_json::from_slice(&bytes)?;
                info!("loaded credentials from {}", path.display());
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no credentials at {}, a new device will pair", path.display());
                AuthState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current state.
    pub async fn snapshot(&self) -> AuthState {
        self.state.lock().await.clone()
    }

    /// Run `f` against the current state without persisting.
    pub async fn read<R>(&self, f: impl FnOnce(&AuthState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Mutate the state and rewrite the file before releasing the lock.
    pub async fn update<R>(&self, f: impl FnOnce(&mut AuthState) -> R) -> Result<R, BotError> {
        let mut state = self.state.lock().await;
        let out = f(&mut state);
        persist(&self.path, &state).await?;
        Ok(out)
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn persist(path: &Path, state: &AuthState) -> Result<(), BotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let data = serde_json::to_vec_pretty(state)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &data).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("credentials saved ({} bytes)", data.len());
    Ok(())
}

#[cfg_attr(not(feature = "whatsapp-web"), allow(dead_code))]
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

#[cfg_attr(not(feature = "whatsapp-web"), allow(dead_code))]
pub(crate) fn from_hex(text: &str) -> Result<Vec<u8>, BotError> {
    hex::decode(text).map_err(|e| BotError::Session(format!("corrupt credential blob: {e}")))
}
