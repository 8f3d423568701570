use thiserror::Error;

/// Top-level error type for papagaio.
#[derive(Debug, Error)]
pub enum BotError {
    /// Error from the messaging session layer.
    #[error("session error: {0}")]
    Session(String),

    /// Error from a media fetcher (speech synthesis, image download).
    #[error("media error: {0}")]
    Media(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The phrase corpus has no usable line.
    #[error("phrase corpus at {0} is empty")]
    EmptyCorpus(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
