//! Question answering and summarization models.
//!
//! Handlers only see the [`QuestionAnswerer`] and [`Summarizer`] traits. The
//! production implementation, [`InferenceClient`], talks to a hosted inference API
//! (`POST {api_url}/models/{model}`) for both.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_QA_MODEL: &str = "deepset/roberta-large-squad2";
pub const DEFAULT_SUMMARY_MODEL: &str = "facebook/bart-large-cnn";

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Model {model} returned HTTP {status}: {message}")]
    Api {
        model: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response from {model}: {message}")]
    Decode { model: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Raw output of a question answering model. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaOutput {
    pub answer: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryParams {
    pub min_length: u32,
    pub max_length: u32,
    pub do_sample: bool,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            min_length: 50,
            max_length: 100,
            do_sample: false,
        }
    }
}

#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Extract an answer to `question` from `context`.
    async fn answer(&self, question: &str, context: &str) -> Result<QaOutput, InferenceError>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`. `Ok(None)` means the model produced no summary.
    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<Option<String>, InferenceError>;
}

#[derive(Clone)]
pub struct InferenceSettings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub qa_model: String,
    pub summary_model: String,
    pub timeout: Duration,
}

// The token never reaches logs.
impl std::fmt::Debug for InferenceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSettings")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("qa_model", &self.qa_model)
            .field("summary_model", &self.summary_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            qa_model: DEFAULT_QA_MODEL.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Serialize)]
struct QaInputs<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Serialize)]
struct QaRequest<'a> {
    inputs: QaInputs<'a>,
    options: WaitOptions,
}

#[derive(Deserialize)]
struct QaAnswer {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

// Some deployments wrap the best answer in a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum QaResponse {
    One(QaAnswer),
    Many(Vec<QaAnswer>),
}

#[derive(Serialize)]
struct WaitOptions {
    wait_for_model: bool,
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
    parameters: &'a SummaryParams,
    options: WaitOptions,
}

#[derive(Deserialize)]
struct SummaryItem {
    summary_text: String,
}

/// Client for a hosted inference API serving both models.
pub struct InferenceClient {
    client: Client,
    settings: InferenceSettings,
}

impl InferenceClient {
    pub fn new(settings: InferenceSettings) -> Result<Self, InferenceError> {
        let client = ClientBuilder::new()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| InferenceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    async fn call<B, T>(&self, model: &str, body: &B) -> Result<T, InferenceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!(
            "{}/models/{}",
            self.settings.api_url.trim_end_matches('/'),
            model
        );

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.settings.api_token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let res = request.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        tracing::debug!(model, status = status.as_u16(), elapsed = ?started.elapsed(), "inference call finished");

        if !status.is_success() {
            return Err(InferenceError::Api {
                model: model.to_string(),
                status: status.as_u16(),
                message: api_error_message(&bytes),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| InferenceError::Decode {
            model: model.to_string(),
            message: e.to_string(),
        })
    }
}

fn api_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error").map(|err| match err.as_str() {
                Some(msg) => msg.to_string(),
                None => err.to_string(),
            })
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

#[async_trait]
impl QuestionAnswerer for InferenceClient {
    async fn answer(&self, question: &str, context: &str) -> Result<QaOutput, InferenceError> {
        let body = QaRequest {
            inputs: QaInputs { question, context },
            options: WaitOptions {
                wait_for_model: true,
            },
        };
        let response: QaResponse = self.call(&self.settings.qa_model, &body).await?;

        let best = match response {
            QaResponse::One(answer) => Some(answer),
            QaResponse::Many(answers) => answers.into_iter().next(),
        };

        Ok(best
            .map(|best| QaOutput {
                answer: best.answer,
                score: best.score,
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl Summarizer for InferenceClient {
    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<Option<String>, InferenceError> {
        let body = SummaryRequest {
            inputs: text,
            parameters: params,
            options: WaitOptions {
                wait_for_model: true,
            },
        };
        let summaries: Vec<SummaryItem> = self.call(&self.settings.summary_model, &body).await?;

        Ok(summaries
            .into_iter()
            .next()
            .map(|item| item.summary_text.trim().to_string())
            .filter(|summary| !summary.is_empty()))
    }
}
