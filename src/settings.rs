//! Server settings from the environment (after `dotenvy`).
//!
//! Each app reads `<PREFIX>_BIND_ADDR`, `<PREFIX>_DATABASE_URL` and `<PREFIX>_MAX_CONNECTIONS`,
//! then the unprefixed names, then its built-in defaults.

use crate::error::ConfigError;
use std::net::SocketAddr;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
}

impl ServerSettings {
    /// Read settings for the app with the given env prefix and defaults.
    pub fn from_env(prefix: &str, default_bind: &str, default_database_url: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, default_bind, default_database_url, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(
        prefix: &str,
        default_bind: &str,
        default_database_url: &str,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(&format!("{}_{}", prefix, name))
                .or_else(|| lookup(name))
                .filter(|v| !v.trim().is_empty())
        };

        let bind = read("BIND_ADDR").unwrap_or_else(|| default_bind.to_string());
        let bind_addr = bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Settings(format!("invalid bind address: {}", bind)))?;
        let database_url = read("DATABASE_URL").unwrap_or_else(|| default_database_url.to_string());
        let max_connections = match read("MAX_CONNECTIONS") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Settings(format!("invalid max connections: {}", v)))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(ServerSettings {
            bind_addr,
            database_url,
            max_connections,
        })
    }
}
