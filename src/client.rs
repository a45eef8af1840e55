use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use crate::config::{ApiConfig, ConfigError};
use crate::error::Result;

/// Shared handle to the metadata API. Cloning is cheap; every clone reuses
/// the same connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    discover_url: String,
    api_base: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::try_from(format!("Bearer {}", config.api_key))
            .map_err(|_| ConfigError::InvalidKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            discover_url: config.discover_url.clone(),
            api_base: config.api_base.clone(),
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn discover_url(&self) -> &str {
        &self.discover_url
    }

    pub fn reviews_url(&self, movie_id: i64) -> String {
        format!("{}/movie/{}/reviews", self.api_base, movie_id)
    }
}
