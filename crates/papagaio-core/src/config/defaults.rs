pub(super) fn default_client_name() -> String {
    "chatbot".to_string()
}
pub(super) fn default_display_name() -> String {
    "Chrome".to_string()
}
pub(super) fn default_data_dir() -> String {
    ".".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_corpus_path() -> String {
    "phrase.txt".to_string()
}
pub(super) fn default_settle_ms() -> u64 {
    500
}
pub(super) fn default_ms_per_word() -> u64 {
    crate::delay::MS_PER_WORD
}
pub(super) fn default_media_dir() -> String {
    "Media".to_string()
}
pub(super) fn default_tts_host() -> String {
    "https://translate.google.com".to_string()
}
pub(super) fn default_tts_lang() -> String {
    "pt".to_string()
}
pub(super) fn default_tts_timeout_secs() -> u64 {
    10
}
pub(super) fn default_tts_split_punct() -> String {
    ",.?".to_string()
}
pub(super) fn default_image_url() -> String {
    "https://source.unsplash.com/random".to_string()
}
pub(super) fn default_coordinate_min() -> f64 {
    -180.0
}
pub(super) fn default_coordinate_max() -> f64 {
    180.0
}
pub(super) fn default_decimals() -> u32 {
    3
}
