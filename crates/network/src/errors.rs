//! Network crate error types

use thiserror::Error;

/// Identifier that is not a recognized OpenAlex entity reference
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Failure to obtain data from the OpenAlex API
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ResolveError),

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Request rejected with status {status}: {url}")]
    BadRequest { status: u16, url: String },

    #[error("Rate limited by upstream: {url}")]
    RateLimited { url: String },

    #[error("Upstream error {status}: {url}")]
    Upstream { status: u16, url: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },
}

impl FetchError {
    /// Whether the retry policy should try again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited { .. }
                | FetchError::Upstream { .. }
                | FetchError::Timeout { .. }
                | FetchError::Transport(_)
                | FetchError::MalformedResponse { .. }
        )
    }

    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidIdentifier(_) => "invalid_identifier",
            FetchError::NotFound { .. } => "not_found",
            FetchError::BadRequest { .. } => "bad_request",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Upstream { .. } => "upstream",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::MalformedResponse { .. } => "malformed_response",
        }
    }

    /// Map a reqwest failure for the given URL
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else if err.is_decode() {
            FetchError::MalformedResponse {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Fatal errors of a network build
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid root work: {0}")]
    InvalidRoot(#[from] ResolveError),

    #[error("Invalid build parameters: {0}")]
    InvalidParams(String),
}

/// Failure while locating or downloading a full text
#[derive(Error, Debug)]
pub enum FullTextError {
    #[error("Full-text lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Full-text service unavailable with status {status}: {url}")]
    Unavailable { status: u16, url: String },

    #[error("Metadata lookup failed: {0}")]
    Metadata(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Upstream { status: 503, url: "u".into() }.is_transient());
        assert!(FetchError::Timeout { url: "u".into() }.is_transient());
        assert!(FetchError::MalformedResponse { url: "u".into(), message: "eof".into() }.is_transient());
        assert!(!FetchError::NotFound { url: "u".into() }.is_transient());
        assert!(!FetchError::BadRequest { status: 400, url: "u".into() }.is_transient());
        assert!(!FetchError::from(ResolveError::InvalidIdentifier("X".into())).is_transient());
    }
}
