//! Shared types for the EVE token proxy

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
