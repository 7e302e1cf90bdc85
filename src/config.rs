use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};
use crate::inference::InferenceSettings;
use crate::scraper::ScrapeSettings;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub scrape: ScrapeSettings,
    pub inference: InferenceSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let ip = IpAddr::from_str(host.trim())
            .map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;
        let port = parse_number::<u16>("PORT", var("PORT"), 5000)?;

        let static_dir = var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static"));

        let scrape_defaults = ScrapeSettings::default();
        let scrape = ScrapeSettings {
            fetch_timeout: Duration::from_secs(parse_number(
                "FETCH_TIMEOUT_SECS",
                var("FETCH_TIMEOUT_SECS"),
                scrape_defaults.fetch_timeout.as_secs(),
            )?),
            page_delay: Duration::from_millis(parse_number(
                "PAGE_DELAY_MS",
                var("PAGE_DELAY_MS"),
                scrape_defaults.page_delay.as_millis() as u64,
            )?),
        };

        let inference_defaults = InferenceSettings::default();
        let inference = InferenceSettings {
            api_url: var("INFERENCE_API_URL").unwrap_or(inference_defaults.api_url),
            api_token: var("HF_API_TOKEN"),
            qa_model: var("QA_MODEL").unwrap_or(inference_defaults.qa_model),
            summary_model: var("SUMMARY_MODEL").unwrap_or(inference_defaults.summary_model),
            timeout: Duration::from_secs(parse_number(
                "INFERENCE_TIMEOUT_SECS",
                var("INFERENCE_TIMEOUT_SECS"),
                inference_defaults.timeout.as_secs(),
            )?),
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            static_dir,
            scrape,
            inference,
        })
    }
}

fn parse_number<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
