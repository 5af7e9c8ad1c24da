//! Request-scoped error types and HTTP mapping
//!
//! Every handler failure flows through `Error`, which maps onto the status
//! taxonomy: validation 400, client-id mismatch 401, unknown token 404,
//! authority failure 502, authority timeout 504, store failure 500. The
//! wire shape is always `{"status":<code>,"error":<detail>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing or empty authorization code")]
    MissingCode,

    #[error("missing or empty token")]
    MissingToken,

    #[error("client_ID missing or does not match this application")]
    ClientIdMismatch,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("no stored token matches the supplied access token")]
    TokenNotFound,

    #[error("SSO authority error: {0}")]
    Sso(#[from] eve_sso::Error),

    #[error("token store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::MissingCode | Error::MissingToken | Error::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::ClientIdMismatch => StatusCode::UNAUTHORIZED,
            Error::TokenNotFound => StatusCode::NOT_FOUND,
            Error::Sso(eve_sso::Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Error::Sso(_) => StatusCode::BAD_GATEWAY,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label for the upstream error counter, None for local failures.
    fn upstream_kind(&self) -> Option<&'static str> {
        match self {
            Error::Sso(eve_sso::Error::Timeout(_)) => Some("timeout"),
            Error::Sso(eve_sso::Error::Transport(_)) => Some("transport"),
            Error::Sso(eve_sso::Error::Status { .. }) => Some("status"),
            Error::Sso(eve_sso::Error::InvalidResponse(_)) => Some("invalid_response"),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        if let Some(kind) = self.upstream_kind() {
            crate::metrics::record_upstream_error(kind);
        }
        crate::metrics::record_failure(status.as_u16());

        let body = serde_json::json!({
            "status": status.as_u16(),
            "error": self.to_string(),
        });
        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
