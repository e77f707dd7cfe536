use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;

use super::{SourceClient, SourceError, SourceQuery};
use crate::config::SourceConfig;

const USER_AGENT: &str = concat!("civic-scorecard/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP source client.
///
/// Issues `GET {base_url}/subjects/{id}/evidence?from=YYYY-MM-DD&to=YYYY-MM-DD`
/// with the API key (if any) in an `X-API-Key` header.
#[derive(Debug, Clone)]
pub struct HttpSourceClient {
    name: String,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSourceClient {
    pub fn new(config: &SourceConfig, api_key: Option<String>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base_url for source {}", config.name))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid base_url for source {}: not a base URL", config.name);
        }

        install_crypto_provider();

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            name: config.name.clone(),
            base_url,
            api_key,
            timeout: config.timeout(),
            client,
        })
    }

    fn evidence_url(&self, query: &SourceQuery) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["subjects", query.subject_id.as_str(), "evidence"]);
        }
        url.query_pairs_mut()
            .append_pair("from", &query.from.format("%Y-%m-%d").to_string())
            .append_pair("to", &query.to.format("%Y-%m-%d").to_string());
        url
    }

    fn transport_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout {
                source_name: self.name.clone(),
                after: self.timeout,
            }
        } else {
            SourceError::Unavailable {
                source_name: self.name.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self, query: &SourceQuery) -> Result<serde_json::Value, SourceError> {
        let url = self.evidence_url(query);
        tracing::debug!(source = self.name.as_str(), %url, "requesting evidence");

        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        match status {
            // Provider has nothing on record for this subject
            StatusCode::NOT_FOUND => return Ok(serde_json::Value::Null),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(SourceError::RateLimited {
                    source_name: self.name.clone(),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Unauthorized {
                    source_name: self.name.clone(),
                    status: status.as_u16(),
                })
            }
            s if !s.is_success() => {
                return Err(SourceError::Unavailable {
                    source_name: self.name.clone(),
                    reason: format!("HTTP {}", s),
                })
            }
            _ => {}
        }

        response.json::<serde_json::Value>().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                SourceError::Payload {
                    source_name: self.name.clone(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

/// Install ring as the process-wide rustls crypto provider (required for rustls 0.23+).
/// A provider that is already installed is left in place.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
