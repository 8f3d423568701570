//! Phrase corpus: one candidate reply per line of a text file.

use crate::chance::Chance;
use crate::error::BotError;
use std::path::{Path, PathBuf};

/// Lines of the corpus as read from disk. Never empty.
#[derive(Debug, Clone)]
pub struct Corpus {
    lines: Vec<String>,
}

impl Corpus {
    /// Split newline-delimited text into phrases, dropping blank lines.
    ///
    /// `origin` only labels the error when nothing usable remains.
    pub fn parse(text: &str, origin: &str) -> Result<Self, BotError> {
        let lines: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        if lines.is_empty() {
            return Err(BotError::EmptyCorpus(origin.to_string()));
        }
        Ok(Self { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Pick one line uniformly at random.
    pub fn choose(&self, chance: &mut dyn Chance) -> &str {
        &self.lines[chance.below(self.lines.len())]
    }
}

/// Reads the corpus file fresh on every request; edits apply without a restart.
#[derive(Debug, Clone)]
pub struct PhraseSource {
    path: PathBuf,
}

impl PhraseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the whole corpus.
    pub async fn read(&self) -> Result<Corpus, BotError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BotError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read corpus {}: {e}", self.path.display()),
            ))
        })?;
        Corpus::parse(&text, &self.path.display().to_string())
    }

    /// Read the corpus and return one random phrase.
    pub async fn next_phrase(&self, chance: &mut dyn Chance) -> Result<String, BotError> {
        let corpus = self.read().await?;
        Ok(corpus.choose(chance).to_string())
    }
}
