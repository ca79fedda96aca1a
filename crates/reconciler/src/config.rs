//! Environment-driven reconciler configuration.

use std::time::Duration;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime knobs for the reconciler process.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub database_url: String,
    /// How often each per-kind scheduler scans for due rows.
    pub tick_interval: Duration,
    /// Max rows claimed per kind per tick.
    pub claim_batch_size: i64,
    /// How long a claimed row stays invisible to other claimers.
    pub lease: Duration,
    /// Cap on concurrently running transition listeners.
    pub dispatch_concurrency: usize,
}

impl ReconcilerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a lookup function. Split out from
    /// [`ReconcilerConfig::from_env`] so tests never mutate process state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let tick_secs: u64 = parse_or(&lookup, "RECONCILE_TICK_SECS", 3)?;
        let claim_batch_size: i64 = parse_or(&lookup, "RECONCILE_BATCH_SIZE", 25)?;
        let lease_secs: u64 = parse_or(&lookup, "RECONCILE_LEASE_SECS", 30)?;
        let dispatch_concurrency: usize = parse_or(&lookup, "RECONCILE_DISPATCH_CONCURRENCY", 16)?;

        Ok(Self {
            database_url,
            tick_interval: Duration::from_secs(tick_secs),
            claim_batch_size,
            lease: Duration::from_secs(lease_secs),
            dispatch_concurrency,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
