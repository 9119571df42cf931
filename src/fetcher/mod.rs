pub mod http_fetcher;

use async_trait::async_trait;

pub use http_fetcher::HttpFetcher;

/// Typed per-source fetch failure. Transient classes are retried with
/// backoff; permanent ones fail the source immediately. Either way the
/// failure is contained to the source and never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout => true,
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            FetchError::Transport(_) => true,
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait Fetcher {
    /// Fetch one feed payload. Retries transient failures internally.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Status(429).is_transient());
        assert!(FetchError::Status(500).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Transport("connection reset".into()).is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::Status(403).is_transient());
        assert!(!FetchError::Status(410).is_transient());
    }
}
