//! EVE Online SSO client library
//!
//! Wraps the two interactions the token proxy has with the identity
//! authority: the token endpoint (authorization-code exchange and
//! refresh-token renewal) and the identity verification endpoint. This
//! crate is a standalone library with no dependency on the proxy binary —
//! it can be tested and used independently.
//!
//! Token flow:
//! 1. The proxy receives an authorization code from the frontend
//! 2. `SsoClient::exchange_code()` trades it for an access/refresh pair
//! 3. `SsoClient::verify()` resolves the access token to a character
//! 4. Later, `SsoClient::refresh()` mints a new access token from the
//!    stored refresh token

pub mod client;
pub mod constants;
pub mod error;

pub use client::{SsoClient, TokenResponse, VerifiedCharacter};
pub use constants::*;
pub use error::{Error, Result};
