use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::schema::SchemaProfile;
use crate::store::PoolOptions;

const DB_PATH: &str = "roadgraph.redb";
const MAX_SESSIONS_LIMIT: usize = u32::MAX as usize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub schema: SchemaProfile,
    pub pool: PoolOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("ROADGRAPH_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_var(&lookup, "ROADGRAPH_PORT", 3000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var: "ROADGRAPH_HOST",
                value: host.clone(),
                reason: "not an IP address".to_string(),
            })?;

        let db_path = lookup("ROADGRAPH_DB_PATH").unwrap_or_else(|| DB_PATH.to_string());
        let schema = parse_var(&lookup, "ROADGRAPH_SCHEMA", SchemaProfile::default())?;

        let defaults = PoolOptions::default();
        let max_sessions = parse_var(&lookup, "ROADGRAPH_MAX_SESSIONS", defaults.max_sessions)?;
        // The pool is drained on close by acquiring every slot in one u32 request.
        if max_sessions == 0 || max_sessions > MAX_SESSIONS_LIMIT {
            return Err(ConfigError::Invalid {
                var: "ROADGRAPH_MAX_SESSIONS",
                value: max_sessions.to_string(),
                reason: format!("must be between 1 and {MAX_SESSIONS_LIMIT}"),
            });
        }
        let acquire_timeout = parse_var(
            &lookup,
            "ROADGRAPH_ACQUIRE_TIMEOUT_SECS",
            defaults.acquire_timeout.as_secs(),
        )?;

        Ok(Self {
            addr,
            db_path: PathBuf::from(db_path),
            schema,
            pool: PoolOptions {
                max_sessions,
                acquire_timeout: Duration::from_secs(acquire_timeout),
            },
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|error: T::Err| ConfigError::Invalid {
            var,
            value,
            reason: error.to_string(),
        }),
        None => Ok(default),
    }
}
