use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::scraper::PageOutcome;

#[derive(Deserialize)]
pub struct ScrapeRequest {
    // Kept loose so a missing or non-list value gets our own 400 message.
    #[serde(default)]
    pub urls: Option<serde_json::Value>,
    #[serde(default)]
    pub depth: Option<serde_json::Number>,
}

impl ScrapeRequest {
    /// Requested pagination depth; anything below 1 means "this page only".
    ///
    /// Whole-number floats such as `2.0` count as integers.
    pub fn depth(&self) -> Result<u32> {
        let Some(depth) = &self.depth else {
            return Ok(1);
        };

        match depth.as_f64() {
            // `as` saturates at u32::MAX.
            Some(value) if value.fract() == 0.0 => Ok(value.max(1.0) as u32),
            _ => Err(AppError::BadRequest(format!(
                "depth must be a whole number, got {}",
                depth
            ))),
        }
    }
}

#[derive(Serialize)]
pub struct ScrapeResponse {
    pub text: String,
    pub pages: Vec<PageReport>,
}

#[derive(Serialize)]
pub struct PageReport {
    pub url: String,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Ok,
    Error,
}

impl From<&PageOutcome> for PageReport {
    fn from(outcome: &PageOutcome) -> Self {
        let (status, error) = match &outcome.result {
            Ok(_) => (PageStatus::Ok, None),
            Err(err) => (PageStatus::Error, Some(err.to_string())),
        };

        PageReport {
            url: outcome.url.clone(),
            status,
            error,
            fetched_at: outcome.fetched_at,
        }
    }
}

#[derive(Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub confidence: String,
    pub source: String,
    pub context_used: String,
}
