use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Url};

use crate::error::{FetchError, ScraperError};

/// One outbound GET, fully prepared by the controller.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

/// Raw response. Non-2xx statuses are returned here, not as errors; the
/// controller decides what they mean.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

/// The network seam of the fetch controller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// [`FetchError::Timeout`] or [`FetchError::Transport`] when no response
    /// could be read.
    async fn get(&self, request: TransportRequest) -> Result<TransportResponse, FetchError>;
}

/// Production transport over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`ScraperError::Client`] if the TLS backend cannot be
    /// initialised.
    pub fn new(request_timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: TransportRequest) -> Result<TransportResponse, FetchError> {
        let timeout_ms = u64::try_from(request.timeout.as_millis()).unwrap_or(u64::MAX);
        let response = self
            .client
            .get(request.url)
            .headers(request.headers)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, timeout_ms))?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, timeout_ms))?;
        Ok(TransportResponse {
            status,
            final_url,
            body,
        })
    }
}
