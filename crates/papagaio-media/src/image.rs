//! Random picture download.

use async_trait::async_trait;
use papagaio_core::{config::MediaConfig, error::BotError, traits::ImageSource};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Streams a random image from a remote endpoint into a fixed file.
pub struct RandomImage {
    http: reqwest::Client,
    url: String,
    output: PathBuf,
}

impl RandomImage {
    pub fn from_config(cfg: &MediaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: cfg.image_url.clone(),
            output: cfg.image_path(),
        }
    }
}

#[async_trait]
impl ImageSource for RandomImage {
    async fn fetch_random(&self) -> Result<PathBuf, BotError> {
        let mut resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BotError::Media(format!("image request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(BotError::Media(format!(
                "image endpoint error {}",
                resp.status()
            )));
        }

        crate::ensure_parent(&self.output).await?;
        let mut file = tokio::fs::File::create(&self.output).await?;
        let mut written = 0usize;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| BotError::Media(format!("image stream failed: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        info!("wrote {written} byte image to {}", self.output.display());
        Ok(self.output.clone())
    }
}
