use anyhow::{Context, Result};
use std::env;

/// Configuration for the marketplace sell flow
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
}

impl Config {
    /// Load configuration from environment variables and .env file
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if it exists

        let api_base_url = env::var("MARKET_API_URL")
            .context("MARKET_API_URL not found in environment. Please set it in .env file")?;
        Self::validate_base_url(&api_base_url)?;

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Validate the backend base URL
    fn validate_base_url(url: &str) -> Result<()> {
        if url.is_empty() {
            anyhow::bail!("MARKET_API_URL cannot be empty");
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!(
                "MARKET_API_URL '{}' must start with http:// or https://",
                url
            );
        }

        // Require a host after the scheme
        let rest = url
            .trim_start_matches("http://")
            .trim_start_matches("https://");
        if rest.is_empty() || rest.starts_with('/') {
            anyhow::bail!("MARKET_API_URL '{}' is missing a host", url);
        }

        Ok(())
    }

    /// Endpoint that issues pre-signed upload/public URL pairs
    pub fn sign_url(&self) -> String {
        format!("{}/upload/sign", self.api_base_url)
    }

    /// Endpoint that accepts new listing records
    pub fn listings_url(&self) -> String {
        format!("{}/products", self.api_base_url)
    }
}
