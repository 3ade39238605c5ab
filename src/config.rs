use std::env;
use std::net::{AddrParseError, SocketAddr};

const DEFAULT_ADDR: &str = "0.0.0.0:3146";
const DEFAULT_ADMIN_EMAIL: &str = "admin@cinescope.com";

/// Startup settings, read once from the environment (`.env` is loaded first by `main`).
#[derive(Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub session_secret: String,
    pub addr: SocketAddr,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid listen address '{0}': {1}")]
    InvalidAddr(String, AddrParseError),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tmdb_api_key = non_empty("TMDB_API_KEY").ok_or(ConfigError::Missing("TMDB_API_KEY"))?;
        let session_secret =
            non_empty("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;

        let raw_addr = non_empty("CINESCOPE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = raw_addr
            .parse()
            .map_err(|e| ConfigError::InvalidAddr(raw_addr.clone(), e))?;

        Ok(Self {
            tmdb_api_key: tmdb_api_key.trim().to_string(),
            session_secret,
            addr,
            admin_email: non_empty("ADMIN_EMAIL")
                .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            admin_password: non_empty("ADMIN_PASSWORD"),
        })
    }
}
