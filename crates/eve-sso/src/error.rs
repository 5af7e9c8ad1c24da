//! Error types for SSO operations

/// Errors from outbound SSO calls.
///
/// `Timeout` is split from `Transport` so the service can answer 504 for
/// a slow authority and 502 for everything else.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SSO request failed: {0}")]
    Transport(String),

    #[error("SSO request timed out: {0}")]
    Timeout(String),

    #[error("SSO returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid SSO response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Classify a reqwest failure into Timeout vs Transport.
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

/// Result alias for SSO operations.
pub type Result<T> = std::result::Result<T, Error>;
