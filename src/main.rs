use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use rust_qa_scrapper::{
    config::Config,
    api::routes::create_router,
    inference::InferenceClient,
    scraper::Scraper,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rust_qa_scrapper=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    // Models and the page fetcher are built once and shared by every request
    let models = Arc::new(InferenceClient::new(config.inference.clone())?);
    tracing::info!(
        api_url = %config.inference.api_url,
        qa_model = %config.inference.qa_model,
        summary_model = %config.inference.summary_model,
        "inference client ready"
    );
    let scraper = Arc::new(Scraper::new(config.scrape.clone())?);

    let app_state = AppState {
        config: Arc::new(config),
        scraper,
        qa: models.clone(),
        summarizer: models,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
