use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use hollow_api::HasherConfig;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub hasher: HasherConfig,
    /// True when no secret was configured and the dev default is in use.
    pub default_secret: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("HOLLOW_JWT_SECRET").filter(|s| !s.is_empty());
        let default_secret = secret.is_none();
        let defaults = HasherConfig::default();

        Ok(Self {
            jwt_secret: secret.unwrap_or_else(|| DEV_JWT_SECRET.into()),
            db_path: PathBuf::from(lookup("HOLLOW_DB_PATH").unwrap_or_else(|| "hollow.db".into())),
            host: lookup("HOLLOW_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "HOLLOW_PORT", 8080)?,
            hasher: HasherConfig {
                memory_kib: parse_or(&lookup, "HOLLOW_HASH_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or(&lookup, "HOLLOW_HASH_ITERATIONS", defaults.iterations)?,
                parallelism: parse_or(&lookup, "HOLLOW_HASH_PARALLELISM", defaults.parallelism)?,
            },
            default_secret,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key}={raw:?} is not valid")),
        None => Ok(default),
    }
}
