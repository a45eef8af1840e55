//! API credentials and endpoints, read once at startup.

use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set; add it to the environment or a .env file")]
    Missing(&'static str),

    #[error("API_KEY contains characters that cannot be sent in an HTTP header")]
    InvalidKey,
}

/// Everything the HTTP client needs to talk to the metadata API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    /// Discovery endpoint queried by release-date window.
    pub discover_url: String,
    /// Prefix for per-movie endpoints such as `/movie/{id}/reviews`.
    pub api_base: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            api_key: api_key.into(),
            discover_url: format!("{api_base}/discover/movie"),
            api_base,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_discover_url(mut self, url: impl Into<String>) -> Self {
        self.discover_url = url.into();
        self
    }

    /// Reads `API_KEY`, `MOVIE_ID_URL` and `TMDB_API_BASE` from the process
    /// environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_blank("API_KEY").ok_or(ConfigError::Missing("API_KEY"))?;
        let api_base = non_blank("TMDB_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let mut config = Self::new(api_key.trim(), api_base);
        if let Some(url) = non_blank("MOVIE_ID_URL") {
            config.discover_url = url;
        }
        Ok(config)
    }
}
