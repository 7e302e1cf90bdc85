pub mod answer;
pub mod api;
pub mod config;
pub mod error;
pub mod inference;
pub mod scraper;

use std::sync::Arc;
use crate::config::Config;
use crate::inference::{QuestionAnswerer, Summarizer};
use crate::scraper::Scraper;

/// Application state that will be shared across handlers.
///
/// The scraper and both models are built once at startup and handed in here, so
/// tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scraper: Arc<Scraper>,
    pub qa: Arc<dyn QuestionAnswerer>,
    pub summarizer: Arc<dyn Summarizer>,
}

/// Returns at most the first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
