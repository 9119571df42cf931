use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::fetcher::FetchError;
use crate::resolver::PageProber;

/// reqwest-backed tier-3 prober: HEAD for the content type, then a
/// bounded streaming GET that stops at the page's `</head>`.
pub struct HttpPageProber {
    client: Client,
}

impl HttpPageProber {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

#[async_trait]
impl PageProber for HttpPageProber {
    async fn head_content_type(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        Ok(response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from))
    }

    async fn fetch_head(&self, url: &str, max_bytes: usize) -> Result<String, FetchError> {
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

        let mut data: Vec<u8> = Vec::new();
        let mut response = response;
        while let Some(chunk) = response.chunk().await.map_err(FetchError::from_reqwest)? {
            // Re-scan only the tail so a marker spanning two chunks is
            // still found.
            let scan_from = data.len().saturating_sub(b"</head>".len());
            data.extend_from_slice(&chunk);
            if data.len() >= max_bytes || contains_head_end(&data[scan_from..]) {
                break;
            }
        }

        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

fn contains_head_end(haystack: &[u8]) -> bool {
    haystack
        .windows(b"</head>".len())
        .any(|w| w.eq_ignore_ascii_case(b"</head>"))
}
