use anyhow::{bail, Context, Result};
use std::env;

pub const DEFAULT_ESTIMATE_FEED_URL: &str = "https://ethgasstation.info/json/ethgasAPI.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub estimate_feed_url: String,
    /// How long a fetched snapshot may be served from cache.
    pub estimate_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub fiat_currency: String,
    /// Ticker of the asset fees are paid in. Anything other than ETH starts
    /// the selector in the manual editor.
    pub ticker: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            estimate_feed_url: env::var("ESTIMATE_FEED_URL")
                .unwrap_or_else(|_| DEFAULT_ESTIMATE_FEED_URL.to_string()),
            estimate_ttl_secs: env::var("ESTIMATE_TTL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid ESTIMATE_TTL_SECS")?,
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid HTTP_TIMEOUT_SECS")?,
            fiat_currency: env::var("FIAT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            ticker: env::var("TICKER").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.estimate_feed_url.starts_with("http") {
            bail!("ESTIMATE_FEED_URL must be an HTTP(S) URL");
        }
        if self.http_timeout_secs == 0 {
            bail!("HTTP_TIMEOUT_SECS must be positive");
        }
        tracing::debug!("Configuration validated");
        Ok(())
    }
}
