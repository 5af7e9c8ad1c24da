//! SSO token exchange, refresh, and identity verification
//!
//! All three operations go through `SsoClient`, which carries the reqwest
//! client, the authority base URL, and the precomputed HTTP Basic header
//! for `client_id:client_secret`. The base URL is injectable so tests can
//! stand up a local mock authority.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_BASE_URL, TOKEN_PATH, VERIFY_PATH};
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// The authority also sends `token_type` and `expires_in`; the proxy does
/// not track expiry (renewal is caller-driven via `/refresh`), so only the
/// credential pair is kept.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response from the verification endpoint.
///
/// The authority uses PascalCase keys here, unlike the token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifiedCharacter {
    #[serde(rename = "CharacterID")]
    pub character_id: i64,
    #[serde(rename = "CharacterName")]
    pub character_name: String,
}

/// Client for the EVE SSO authority.
///
/// Cheap to clone; the inner reqwest client is an Arc internally.
#[derive(Clone)]
pub struct SsoClient {
    http: reqwest::Client,
    base_url: String,
    basic_authorization: String,
    user_agent: String,
}

impl SsoClient {
    /// Build a client against the production authority.
    pub fn new(http: reqwest::Client, client_id: &str, client_secret: &str, user_agent: &str) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL, client_id, client_secret, user_agent)
    }

    /// Build a client against an arbitrary authority base URL (tests).
    pub fn with_base_url(
        http: reqwest::Client,
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        user_agent: &str,
    ) -> Self {
        let basic_authorization = format!(
            "Basic {}",
            STANDARD.encode(format!("{client_id}:{client_secret}"))
        );
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            basic_authorization,
            user_agent: user_agent.to_string(),
        }
    }

    /// Exchange an authorization code for an access/refresh token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        debug!("exchanging authorization code");
        self.token_grant(&[("grant_type", "authorization_code"), ("code", code)])
            .await
    }

    /// Mint a new access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        debug!("refreshing access token");
        self.token_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// Resolve an access token to the character it was issued for.
    pub async fn verify(&self, access_token: &str) -> Result<VerifiedCharacter> {
        let response = self
            .http
            .get(format!("{}{VERIFY_PATH}", self.base_url))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<VerifiedCharacter>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("verify response: {e}")))
    }

    /// POST the token endpoint with the given grant parameters.
    async fn token_grant(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(format!("{}{TOKEN_PATH}", self.base_url))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, &self.basic_authorization)
            .header(USER_AGENT, &self.user_agent)
            .form(params)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::InvalidResponse(format!("token response: {e}")))
    }
}
