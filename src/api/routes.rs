use axum::{
    routing::post,
    Router,
    extract::{Json, State, rejection::JsonRejection},
};
use serde_json::Value;
use tower_http::cors::{CorsLayer, Any};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use std::time::Instant;
use url::Url;

use crate::answer;
use crate::error::{Result, AppError};
use crate::api::models::{AskRequest, AskResponse, PageReport, ScrapeRequest, ScrapeResponse};
use crate::scraper::parse_target;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    let static_dir = app_state.config.static_dir.clone();

    Router::new()
        .route("/scrape", post(scrape_handler))
        .route("/ask", post(ask_handler))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn scrape_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>> {
    let Json(req) = payload?;

    // Every URL is checked before anything is fetched.
    let urls = validate_urls(req.urls.as_ref())?;
    let depth = req.depth()?;
    tracing::info!(urls = urls.len(), depth, "processing scrape request");

    let start_time = Instant::now();
    let report = state.scraper.scrape_all(&urls, depth).await;
    tracing::info!(
        pages = report.pages.len(),
        failed = report.failed_pages(),
        chars = report.text.chars().count(),
        elapsed = ?start_time.elapsed(),
        "scrape request finished"
    );

    Ok(Json(ScrapeResponse {
        pages: report.pages.iter().map(PageReport::from).collect(),
        text: report.text,
    }))
}

fn validate_urls(urls: Option<&Value>) -> Result<Vec<Url>> {
    let list = match urls {
        Some(Value::Array(list)) if !list.is_empty() => list,
        _ => {
            return Err(AppError::BadRequest(
                "A list of URLs is required".to_string(),
            ));
        }
    };

    list.iter()
        .map(|entry| match entry {
            Value::String(raw) => parse_target(raw).ok_or_else(|| invalid_url(raw)),
            other => Err(invalid_url(&other.to_string())),
        })
        .collect()
}

fn invalid_url(raw: &str) -> AppError {
    AppError::BadRequest(format!("Invalid URL: {}", raw))
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>> {
    let Json(req) = payload?;
    let question = req.question.unwrap_or_default();
    let context = req.context.unwrap_or_default();
    tracing::info!(
        question_chars = question.chars().count(),
        context_chars = context.chars().count(),
        "processing ask request"
    );

    let start_time = Instant::now();
    let response = answer::answer(
        state.qa.as_ref(),
        state.summarizer.as_ref(),
        &question,
        &context,
    )
    .await?;
    tracing::info!(
        confidence = %response.confidence,
        elapsed = ?start_time.elapsed(),
        "ask request finished"
    );

    Ok(Json(response))
}
