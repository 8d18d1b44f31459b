use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

pub const DEFAULT_LOG_FILTER: &str = "mingle=debug,mingle_api=debug,mingle_db=info,tower_http=debug";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub db_readers: usize,
}

impl Config {
    /// Read `MINGLE_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: lookup("MINGLE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "MINGLE_PORT", 3000)?,
            db_path: lookup("MINGLE_DB_PATH").unwrap_or_else(|| "mingle.db".into()).into(),
            db_readers: parse_or(&lookup, "MINGLE_DB_READERS", 4)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
