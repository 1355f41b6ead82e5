//! Error types for exchange data fetches.

use thiserror::Error;

/// Errors that can occur while fetching exchange data.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout(err.to_string())
        } else if err.is_decode() {
            FeedError::ParseError(err.to_string())
        } else if let Some(status) = err.status() {
            FeedError::from_status(status)
        } else {
            FeedError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::InvalidUrl(err.to_string())
    }
}

impl FeedError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            FeedError::RateLimitExceeded
        } else {
            FeedError::HttpStatus(status.as_u16())
        }
    }

    /// Returns true if this error is transient and likely to succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::ConnectionFailed(_) | FeedError::Timeout(_) | FeedError::RateLimitExceeded => {
                true
            }
            FeedError::HttpStatus(code) => is_retryable_code(*code),
            FeedError::ParseError(_) | FeedError::InvalidUrl(_) => false,
        }
    }
}

/// Statuses worth retrying at the transport layer: 429 and the usual 5xx.
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    is_retryable_code(status.as_u16())
}

fn is_retryable_code(code: u16) -> bool {
    matches!(code, 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::NOT_IMPLEMENTED));
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            FeedError::from_status(StatusCode::TOO_MANY_REQUESTS),
            FeedError::RateLimitExceeded
        ));
        assert!(matches!(
            FeedError::from_status(StatusCode::FORBIDDEN),
            FeedError::HttpStatus(403)
        ));
    }

    #[test]
    fn test_is_transient() {
        assert!(FeedError::Timeout("slow".into()).is_transient());
        assert!(FeedError::HttpStatus(503).is_transient());
        assert!(!FeedError::HttpStatus(404).is_transient());
        assert!(!FeedError::ParseError("bad json".into()).is_transient());
    }
}
