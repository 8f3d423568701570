//! Typing/recording delay derived from a phrase's length.

use std::time::Duration;

/// Half a second per word.
pub const MS_PER_WORD: u64 = 500;

/// Delay for `phrase` at the default pace: `word_count / 2` seconds.
///
/// There is no minimum: an empty phrase sends immediately.
pub fn compute_delay(phrase: &str) -> Duration {
    compute_delay_with(phrase, MS_PER_WORD)
}

/// Delay for `phrase` at `ms_per_word` milliseconds per whitespace-separated word.
pub fn compute_delay_with(phrase: &str, ms_per_word: u64) -> Duration {
    let words = phrase.split_whitespace().count() as u64;
    Duration::from_millis(words.saturating_mul(ms_per_word))
}
