//! EVE SSO endpoint constants
//!
//! The authority base URL is fixed in production; tests point `SsoClient`
//! at a local mock instead. The client id/secret are per-application
//! settings and live in the proxy's configuration, not here.

/// Production SSO authority base URL
pub const DEFAULT_BASE_URL: &str = "https://login.eveonline.com";

/// Token endpoint path, for both `authorization_code` and `refresh_token` grants
pub const TOKEN_PATH: &str = "/oauth/token";

/// Identity verification endpoint path (Bearer auth with an access token)
pub const VERIFY_PATH: &str = "/oauth/verify";
