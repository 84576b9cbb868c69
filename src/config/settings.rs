//! Environment-sourced process configuration (spec.md §6).
//!
//! Mirrors the original `pydantic_settings.BaseSettings` in spirit — typed,
//! defaulted, env-first — expressed the way the teacher crate validates its
//! own `PoolConfig`: a plain struct with a `validate`/parse step, no macro
//! magic.

use std::time::Duration;

use thiserror::Error;

use crate::core::symbols::SymbolEntry;

/// Selects which [`crate::repository::RateRepository`] variant to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    /// Document-store variant (MongoDB).
    Mongo,
    /// List-per-key variant (Redis).
    Redis,
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that failed to parse.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// The environment variable name.
        key: &'static str,
        /// The raw value that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Retention window (seconds) for history queries and the list-store cap.
    pub history_period_secs: i64,
    /// Poll cadence.
    pub parser_interval: Duration,
    /// Per-fetch timeout.
    pub parser_timeout: Duration,
    /// Notifier pool worker count.
    pub notifier_worker_concurrency: usize,
    /// DB pool worker count.
    pub db_worker_concurrency: usize,
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// MongoDB connection string.
    pub mongo_uri: String,
    /// Redis host.
    pub redis_host: String,
    /// Redis port.
    pub redis_port: u16,
    /// Which repository backend to construct.
    pub db: DbBackend,
    /// Static symbol table entries.
    pub available_symbols: Vec<SymbolEntry>,
}

impl Config {
    /// Load configuration from the process environment, applying a `.env`
    /// file first if present (`dotenvy`), falling back to the documented
    /// defaults for anything unset.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            history_period_secs: parse_env("HISTORY_PERIOD", 1800)?,
            parser_interval: Duration::from_secs_f64(parse_env("PARSER_INTERVAL", 1.0)?),
            parser_timeout: Duration::from_secs_f64(parse_env("PARSER_TIMEOUT", 0.5)?),
            notifier_worker_concurrency: parse_env("NOTIFIER_WORKER_CONCURRENCY", 5)?,
            db_worker_concurrency: parse_env("DB_WORKER_CONCURRENCY", 1)?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            mongo_uri: std::env::var("MONGO_URI")
                .unwrap_or_else(|_| "mongodb://mongo:27017".to_string()),
            redis_host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "redis".to_string()),
            redis_port: parse_env("REDIS_PORT", 6379)?,
            db: parse_db_backend()?,
            available_symbols: parse_symbols(std::env::var("AVAILABLE_SYMBOLS").ok())?,
        })
    }

    /// Validate cross-field invariants that a single env var can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_period_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "HISTORY_PERIOD",
                value: self.history_period_secs.to_string(),
                reason: "must be positive".into(),
            });
        }
        if self.notifier_worker_concurrency == 0 || self.db_worker_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "*_WORKER_CONCURRENCY",
                value: "0".into(),
                reason: "pool must have at least one worker".into(),
            });
        }
        if self.available_symbols.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "AVAILABLE_SYMBOLS",
                value: String::new(),
                reason: "at least one symbol must be configured".into(),
            });
        }
        Ok(())
    }
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_db_backend() -> Result<DbBackend, ConfigError> {
    match std::env::var("DB").as_deref() {
        Ok("mongo") => Ok(DbBackend::Mongo),
        Ok("redis") | Err(_) => Ok(DbBackend::Redis),
        Ok(other) => Err(ConfigError::InvalidValue {
            key: "DB",
            value: other.to_string(),
            reason: "expected \"mongo\" or \"redis\"".into(),
        }),
    }
}

/// Parse `AVAILABLE_SYMBOLS` as a JSON array of `{"id": u32, "name": str}`
/// entries, mirroring the shape `pydantic_settings` accepts for its
/// list-of-dict default. `None` (the env var unset) falls back to
/// [`default_symbols`]. Takes the already-read value rather than reading
/// the environment itself, so it can be unit-tested without racing other
/// tests over process-global env state.
fn parse_symbols(raw: Option<String>) -> Result<Vec<SymbolEntry>, ConfigError> {
    match raw {
        Some(json) => serde_json::from_str(&json).map_err(|e| ConfigError::InvalidValue {
            key: "AVAILABLE_SYMBOLS",
            value: json,
            reason: e.to_string(),
        }),
        None => Ok(default_symbols()),
    }
}

fn default_symbols() -> Vec<SymbolEntry> {
    vec![
        SymbolEntry { id: 1, name: "EURUSD".into() },
        SymbolEntry { id: 2, name: "USDJPY".into() },
        SymbolEntry { id: 3, name: "GBPUSD".into() },
        SymbolEntry { id: 4, name: "AUDUSD".into() },
        SymbolEntry { id: 5, name: "USDCAD".into() },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_symbols_match_spec_majors() {
        let syms = default_symbols();
        assert_eq!(syms.len(), 5);
        assert_eq!(syms[0].name, "EURUSD");
        assert_eq!(syms[4].name, "USDCAD");
    }

    #[test]
    fn validate_rejects_zero_history_period() {
        let mut cfg = Config {
            history_period_secs: 0,
            parser_interval: Duration::from_secs(1),
            parser_timeout: Duration::from_millis(500),
            notifier_worker_concurrency: 5,
            db_worker_concurrency: 1,
            host: "0.0.0.0".into(),
            port: 8080,
            mongo_uri: String::new(),
            redis_host: String::new(),
            redis_port: 6379,
            db: DbBackend::Redis,
            available_symbols: default_symbols(),
        };
        assert!(cfg.validate().is_err());
        cfg.history_period_secs = 1800;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_symbols_falls_back_to_default_when_unset() {
        assert_eq!(parse_symbols(None).unwrap(), default_symbols());
    }

    #[test]
    fn parse_symbols_reads_json_array() {
        let raw = r#"[{"id":10,"name":"NZDUSD"},{"id":11,"name":"USDCHF"}]"#.to_string();
        let parsed = parse_symbols(Some(raw)).unwrap();
        assert_eq!(parsed, vec![
            SymbolEntry { id: 10, name: "NZDUSD".into() },
            SymbolEntry { id: 11, name: "USDCHF".into() },
        ]);
    }

    #[test]
    fn parse_symbols_rejects_malformed_json() {
        assert!(parse_symbols(Some("not json".to_string())).is_err());
    }

    #[test]
    fn validate_rejects_empty_symbol_table() {
        let cfg = Config {
            history_period_secs: 1800,
            parser_interval: Duration::from_secs(1),
            parser_timeout: Duration::from_millis(500),
            notifier_worker_concurrency: 5,
            db_worker_concurrency: 1,
            host: "0.0.0.0".into(),
            port: 8080,
            mongo_uri: String::new(),
            redis_host: String::new(),
            redis_port: 6379,
            db: DbBackend::Redis,
            available_symbols: vec![],
        };
        assert!(cfg.validate().is_err());
    }
}
