mod defaults;


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::BotError;
use crate::location::MAX_DECIMALS;
use defaults::*;

/// Environment variable overriding [`BotConfig::client_name`].
pub const ENV_CLIENT_NAME: &str = "BROWSER_CLIENT";
/// Environment variable overriding [`BotConfig::display_name`].
pub const ENV_DISPLAY_NAME: &str = "BROWSER_NAME";

/// Top-level papagaio configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub location: LocationConfig,
}

/// Identity of the linked device and where its state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Names the credential file (`{client_name}_auth_info.json`).
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Browser name shown under Linked Devices on the phone.
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            display_name: default_display_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Reply pacing and phrase corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,
    /// Pause after subscribing to presence, before the typing indicator.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_ms_per_word")]
    pub ms_per_word: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            settle_ms: default_settle_ms(),
            ms_per_word: default_ms_per_word(),
        }
    }
}

/// Speech synthesis and image download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding `audio.mp3` and `image.png`.
    #[serde(default = "default_media_dir")]
    pub dir: String,
    #[serde(default = "default_tts_host")]
    pub tts_host: String,
    #[serde(default = "default_tts_lang")]
    pub tts_lang: String,
    #[serde(default)]
    pub tts_slow: bool,
    #[serde(default = "default_tts_timeout_secs")]
    pub tts_timeout_secs: u64,
    /// Characters long texts are split after before synthesis.
    #[serde(default = "default_tts_split_punct")]
    pub tts_split_punct: String,
    #[serde(default = "default_image_url")]
    pub image_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
            tts_host: default_tts_host(),
            tts_lang: default_tts_lang(),
            tts_slow: false,
            tts_timeout_secs: default_tts_timeout_secs(),
            tts_split_punct: default_tts_split_punct(),
            image_url: default_image_url(),
        }
    }
}

impl MediaConfig {
    pub fn audio_path(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.dir)).join("audio.mp3")
    }

    pub fn image_path(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.dir)).join("image.png")
    }
}

/// Sampling ranges for location replies.
///
/// Latitude defaults to the longitude range, [-180, 180]. Set
/// `latitude_min = -90` / `latitude_max = 90` for geographically valid points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_coordinate_min")]
    pub latitude_min: f64,
    #[serde(default = "default_coordinate_max")]
    pub latitude_max: f64,
    #[serde(default = "default_coordinate_min")]
    pub longitude_min: f64,
    #[serde(default = "default_coordinate_max")]
    pub longitude_max: f64,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude_min: default_coordinate_min(),
            latitude_max: default_coordinate_max(),
            longitude_min: default_coordinate_min(),
            longitude_max: default_coordinate_max(),
            decimals: default_decimals(),
        }
    }
}

impl Config {
    /// Overlay `BROWSER_CLIENT` / `BROWSER_NAME` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay environment overrides using `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup(ENV_CLIENT_NAME).filter(|v| !v.trim().is_empty()) {
            self.bot.client_name = name;
        }
        if let Some(name) = lookup(ENV_DISPLAY_NAME).filter(|v| !v.trim().is_empty()) {
            self.bot.display_name = name;
        }
    }

    /// Path of the persisted credential file.
    pub fn auth_path(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.bot.data_dir))
            .join(format!("{}_auth_info.json", self.bot.client_name))
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.bot.data_dir)).join("logs")
    }

    /// Reject values that would make the bot misbehave at runtime.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.bot.client_name.trim().is_empty() {
            return Err(BotError::Config("bot.client_name must not be empty".into()));
        }
        if self.bot.client_name.contains(['/', '\\']) {
            return Err(BotError::Config(format!(
                "bot.client_name '{}' must not contain path separators",
                self.bot.client_name
            )));
        }
        let loc = &self.location;
        if loc.latitude_min > loc.latitude_max || loc.longitude_min > loc.longitude_max {
            return Err(BotError::Config(
                "location ranges must have min <= max".into(),
            ));
        }
        if loc.decimals > MAX_DECIMALS {
            return Err(BotError::Config(format!(
                "location.decimals must be <= {MAX_DECIMALS}, got {}",
                loc.decimals
            )));
        }
        if self.media.tts_timeout_secs == 0 {
            return Err(BotError::Config("media.tts_timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, BotError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BotError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| BotError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
