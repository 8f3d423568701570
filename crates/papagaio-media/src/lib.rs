//! # papagaio-media
//!
//! Media fetchers used by the reply router: Google Translate speech synthesis
//! and random image download. Both write to a fixed file path, overwriting
//! whatever the previous reply left there.

pub mod image;
pub mod tts;

pub use image::RandomImage;
pub use tts::GoogleTts;

use papagaio_core::error::BotError;
use std::path::Path;

/// Make sure the directory holding `path` exists.
pub(crate) async fn ensure_parent(path: &Path) -> Result<(), BotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
