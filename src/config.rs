//! Runtime configuration, resolved from the environment.
//!
//! - `GESTAO_CUSTOS_DB`: database file. Defaults to `gestao-custos.db` in the
//!   platform data directory, which is created if missing.
//! - `GESTAO_CUSTOS_BUSY_TIMEOUT_MS`: how long a writer waits for another
//!   writer's transaction before failing (default 5000).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) const DB_PATH_VAR: &str = "GESTAO_CUSTOS_DB";
pub(crate) const BUSY_TIMEOUT_VAR: &str = "GESTAO_CUSTOS_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = match lookup(DB_PATH_VAR).filter(|v| !v.trim().is_empty()) {
            Some(path) => PathBuf::from(crate::run::shellexpand(path.trim())),
            None => default_db_path()?,
        };

        let busy_timeout = match lookup(BUSY_TIMEOUT_VAR) {
            Some(raw) => {
                let ms: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{BUSY_TIMEOUT_VAR} must be milliseconds, got '{raw}'"))?;
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        };

        Ok(Self {
            db_path,
            busy_timeout,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("pt", "gestao-custos", "GestaoCustos")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("gestao-custos.db"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_explicit_values() {
        let config = Config::from_lookup(|key| match key {
            DB_PATH_VAR => Some("/tmp/obra.db".into()),
            BUSY_TIMEOUT_VAR => Some("250".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/obra.db"));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_default_busy_timeout() {
        let config = Config::from_lookup(|key| match key {
            DB_PATH_VAR => Some("/tmp/obra.db".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.busy_timeout, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS));
    }

    #[test]
    fn test_invalid_busy_timeout() {
        let err = Config::from_lookup(|key| match key {
            DB_PATH_VAR => Some("/tmp/obra.db".into()),
            BUSY_TIMEOUT_VAR => Some("soon".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains(BUSY_TIMEOUT_VAR));
    }
}
