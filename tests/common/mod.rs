#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use rust_qa_scrapper::{
    api::routes::create_router,
    config::Config,
    inference::{InferenceError, InferenceSettings, QaOutput, QuestionAnswerer, SummaryParams, Summarizer},
    scraper::{ScrapeSettings, Scraper},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

/// Question answering model that replays a canned result.
pub struct FakeQa {
    output: Result<QaOutput, String>,
    calls: AtomicUsize,
}

impl FakeQa {
    pub fn answering(answer: &str, score: f64) -> Arc<Self> {
        Self::with_output(QaOutput {
            answer: Some(answer.to_string()),
            score: Some(score),
        })
    }

    pub fn with_output(output: QaOutput) -> Arc<Self> {
        Arc::new(Self {
            output: Ok(output),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            output: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionAnswerer for FakeQa {
    async fn answer(&self, _question: &str, _context: &str) -> Result<QaOutput, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().map_err(|message| InferenceError::Api {
            model: "fake-qa".to_string(),
            status: 500,
            message,
        })
    }
}

/// Summarization model that returns a fixed summary and records its input.
pub struct FakeSummarizer {
    summary: Option<String>,
    calls: AtomicUsize,
    last_input: Mutex<Option<(String, SummaryParams)>>,
}

impl FakeSummarizer {
    pub fn returning(summary: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            summary: summary.map(str::to_string),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<(String, SummaryParams)> {
        self.last_input.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<Option<String>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some((text.to_string(), params.clone()));
        Ok(self.summary.clone())
    }
}

pub fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

pub fn test_state(
    qa: Arc<FakeQa>,
    summarizer: Arc<FakeSummarizer>,
    scrape: ScrapeSettings,
) -> AppState {
    let config = Config {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        static_dir: static_dir(),
        scrape: scrape.clone(),
        inference: InferenceSettings::default(),
    };

    AppState {
        config: Arc::new(config),
        scraper: Arc::new(Scraper::new(scrape).unwrap()),
        qa,
        summarizer,
    }
}

/// Router with idle fake models and the default scrape settings.
pub fn scrape_app() -> Router {
    scrape_app_with(ScrapeSettings::default())
}

pub fn scrape_app_with(scrape: ScrapeSettings) -> Router {
    create_router(test_state(
        FakeQa::answering("unused", 0.0),
        FakeSummarizer::returning(None),
        scrape,
    ))
}

pub fn quick_settings() -> ScrapeSettings {
    ScrapeSettings {
        fetch_timeout: Duration::from_secs(5),
        page_delay: Duration::from_millis(10),
    }
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (u16, Value) {
    send(app, Method::POST, uri, Body::from(body.to_string())).await
}

pub async fn send(app: Router, method: Method, uri: &str, body: Body) -> (u16, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    (status, json_body(response).await)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn html_page(body: &str) -> String {
    format!("<!DOCTYPE html><html><head><title>t</title></head><body>{}</body></html>", body)
}
