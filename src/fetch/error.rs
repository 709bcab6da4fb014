use thiserror::Error;

/// Typed fetch errors enabling retry classification.
///
/// `is_retryable()` separates transient failures (server errors, rate
/// limits, dropped connections) from permanent ones (client errors, disk
/// failures). Either way the run aborts once the retry budget is spent —
/// persisted state is never touched, so a re-run is always safe.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("HTTP error fetching {url}: {source}")]
    Http {
        source: reqwest::Error,
        url: String,
    },

    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),
}

impl FetchError {
    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            FetchError::Http { .. } => true,
            FetchError::Disk(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_404_not_retryable() {
        let e = FetchError::HttpStatus {
            status: 404,
            url: "x".into(),
        };
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_http_429_retryable() {
        let e = FetchError::HttpStatus {
            status: 429,
            url: "x".into(),
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn test_http_503_retryable() {
        let e = FetchError::HttpStatus {
            status: 503,
            url: "x".into(),
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn test_disk_not_retryable() {
        let e = FetchError::Disk(std::io::Error::other("disk full"));
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_transport_error_retryable() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt
            .block_on(reqwest::Client::new().get("http://127.0.0.1:1").send())
            .unwrap_err();
        let e = FetchError::Http {
            source: err,
            url: "x".into(),
        };
        assert!(e.is_retryable());
    }
}
