//! Common error types

use thiserror::Error;

/// Errors shared across the workspace: configuration loading and the I/O
/// it depends on. Everything request-scoped lives in the service crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_detail() {
        let err = Error::Config("missing sso.client_id".into());
        assert_eq!(err.to_string(), "Configuration error: missing sso.client_id");
    }

    #[test]
    fn io_error_converts_via_from() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn error_debug_includes_variant() {
        let err = Error::Config("bad value".into());
        let debug = format!("{err:?}");
        assert!(debug.contains("Config"), "got: {debug}");
    }
}
