//! HTTP transport to the OpenAlex REST API

use crate::errors::FetchError;
use async_trait::async_trait;
use citeforge_common::config::OpenAlexConfig;
use citeforge_common::errors::{AppError, Result as AppResult};
use citeforge_common::{metrics, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Raw JSON GET against the API
#[async_trait]
pub trait OpenAlexTransport: Send + Sync {
    /// GET `path` (relative to the API root) with the given query pairs
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, mailto: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mailto,
        }
    }

    /// Build a client with the configured timeout
    pub fn from_config(config: &OpenAlexConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self::new(client, config.base_url.clone(), config.mailto.clone()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Map a non-success status to a fetch error
pub(crate) fn status_error(status: StatusCode, url: &str) -> FetchError {
    let url = url.to_string();
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound { url },
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited { url },
        s if s.is_server_error() => FetchError::Upstream { status: s.as_u16(), url },
        s => FetchError::BadRequest { status: s.as_u16(), url },
    }
}

#[async_trait]
impl OpenAlexTransport for HttpTransport {
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
        let url = self.url(path);
        let endpoint = path.split('/').next().unwrap_or(path);

        let mut request = self.client.get(&url).query(query);
        if let Some(mailto) = &self.mailto {
            request = request.query(&[("mailto", mailto)]);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_api_request(start.elapsed().as_secs_f64(), endpoint, "error");
                return Err(FetchError::from_reqwest(&url, e));
            }
        };

        let status = response.status();
        metrics::record_api_request(start.elapsed().as_secs_f64(), endpoint, status.as_str());
        debug!(url = %url, status = status.as_u16(), "OpenAlex response");

        if !status.is_success() {
            return Err(status_error(status, &url));
        }

        response.json::<Value>().await.map_err(|e| FetchError::MalformedResponse {
            url: url.clone(),
            message: e.to_string(),
        })
    }
}
