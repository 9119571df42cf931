use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::fetcher::{FetchError, Fetcher};

pub struct HttpFetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            retries: config.retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FetchError::from_reqwest)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    let delay = self.backoff * 2u32.pow(attempt);
                    tracing::debug!("Transient failure for {} ({}), retrying in {:?}", url, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
