//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The SSO client secret is loaded from the EVE_SSO_SECRET env var or
//! secret_file, never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub sso: SsoConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

/// Token store settings
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. `sqlite:tokens.db`
    pub url: String,
}

/// SSO application settings
#[derive(Debug, Deserialize)]
pub struct SsoConfig {
    /// OAuth client id issued by the authority for this application
    pub client_id: String,
    /// User-Agent sent on every outbound SSO call
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// EVE_SSO_SECRET env var)
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
}

fn default_user_agent() -> String {
    "eve-token-proxy/0.1".to_string()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Secret resolution order:
    /// 1. EVE_SSO_SECRET env var
    /// 2. secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.database.url.is_empty() {
            return Err(common::Error::Config("database.url must not be empty".into()));
        }

        if config.sso.client_id.is_empty() {
            return Err(common::Error::Config(
                "sso.client_id must not be empty".into(),
            ));
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("EVE_SSO_SECRET") {
            config.sso.secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.sso.secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.sso.secret = Some(Secret::new(secret));
            }
        }

        match config.sso.secret {
            Some(ref secret) if !secret.is_empty() => Ok(config),
            _ => Err(common::Error::Config(
                "SSO client secret not set: provide EVE_SSO_SECRET or sso.secret_file".into(),
            )),
        }
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("eve-token-proxy.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:8000"

[database]
url = "sqlite:tokens.db"

[sso]
client_id = "client-abc"
user_agent = "medusa-pass/2.0"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_valid_config_with_env_secret() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("EVE_SSO_SECRET", "s3cret") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("EVE_SSO_SECRET") };

        assert_eq!(config.server.listen_addr.port(), 8000);
        assert_eq!(config.database.url, "sqlite:tokens.db");
        assert_eq!(config.sso.client_id, "client-abc");
        assert_eq!(config.sso.user_agent, "medusa-pass/2.0");
        assert_eq!(config.sso.secret.unwrap().expose(), "s3cret");
    }

    #[test]
    fn env_secret_takes_precedence_over_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret");
        std::fs::write(&secret_path, "from-file\n").unwrap();
        let toml = format!(
            "{}secret_file = \"{}\"\n",
            valid_toml(),
            secret_path.display()
        );
        let path = write_config(&dir, &toml);

        unsafe { set_env("EVE_SSO_SECRET", "from-env") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("EVE_SSO_SECRET") };

        assert_eq!(config.sso.secret.unwrap().expose(), "from-env");
    }

    #[test]
    fn secret_file_is_trimmed() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret");
        std::fs::write(&secret_path, "  from-file\n").unwrap();
        let toml = format!(
            "{}secret_file = \"{}\"\n",
            valid_toml(),
            secret_path.display()
        );
        let path = write_config(&dir, &toml);

        unsafe { remove_env("EVE_SSO_SECRET") };
        let config = Config::load(&path).unwrap();

        assert_eq!(config.sso.secret.unwrap().expose(), "from-file");
    }

    #[test]
    fn missing_secret_is_fatal() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { remove_env("EVE_SSO_SECRET") };
        let result = Config::load(&path);

        assert!(matches!(result, Err(common::Error::Config(_))));
    }

    #[test]
    fn empty_client_id_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8000"

[database]
url = "sqlite:tokens.db"

[sso]
client_id = ""
"#,
        );

        unsafe { set_env("EVE_SSO_SECRET", "s3cret") };
        let result = Config::load(&path);
        unsafe { remove_env("EVE_SSO_SECRET") };

        assert!(matches!(result, Err(common::Error::Config(_))));
    }

    #[test]
    fn user_agent_defaults_when_absent() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[server]
listen_addr = "127.0.0.1:8000"

[database]
url = "sqlite:tokens.db"

[sso]
client_id = "client-abc"
"#,
        );

        unsafe { set_env("EVE_SSO_SECRET", "s3cret") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("EVE_SSO_SECRET") };

        assert_eq!(config.sso.user_agent, "eve-token-proxy/0.1");
    }

    #[test]
    fn load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn resolve_path_prefers_cli() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/from/env.toml") };
        let path = Config::resolve_path(Some("/from/cli.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, PathBuf::from("/from/cli.toml"));
    }

    #[test]
    fn resolve_path_falls_back_to_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("eve-token-proxy.toml"));
    }
}
