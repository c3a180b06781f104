//! Runtime configuration, read from the environment (and `.env`, if present).

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_DATA_FILE: &str = "data/barbell.json";
const DEFAULT_PHOTO_DIR: &str = "photos";
const DEFAULT_EXPIRING_WINDOW_DAYS: i64 = 7;
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    /// Where the HTTP server listens
    pub addr: SocketAddr,
    /// Use PostgreSQL when set, otherwise the JSON data file
    pub database_url: Option<String>,
    pub data_file: PathBuf,
    pub photo_dir: PathBuf,
    /// The shared secret staff send in the `BARBELL_TOKEN` header
    pub staff_token: Option<String>,
    /// How many days ahead a membership counts as expiring soon
    pub expiring_window_days: i64,
    /// How often lapsed memberships are marked expired
    pub expiry_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            addr: parse_var("BARBELL_ADDR")?.unwrap_or_else(default_addr),
            database_url: var("DATABASE_URL"),
            data_file: var("BARBELL_DATA_FILE")
                .unwrap_or_else(|| DEFAULT_DATA_FILE.to_owned())
                .into(),
            photo_dir: var("BARBELL_PHOTO_DIR")
                .unwrap_or_else(|| DEFAULT_PHOTO_DIR.to_owned())
                .into(),
            staff_token: var("BARBELL_STAFF_TOKEN"),
            expiring_window_days: parse_var("BARBELL_EXPIRING_WINDOW_DAYS")?
                .unwrap_or(DEFAULT_EXPIRING_WINDOW_DAYS),
            expiry_sweep_secs: parse_var("BARBELL_EXPIRY_SWEEP_SECS")?
                .unwrap_or(DEFAULT_EXPIRY_SWEEP_SECS),
        };

        if config.expiring_window_days < 0 {
            anyhow::bail!("BARBELL_EXPIRING_WINDOW_DAYS must not be negative");
        }
        if config.expiry_sweep_secs == 0 {
            anyhow::bail!("BARBELL_EXPIRY_SWEEP_SECS must be at least 1");
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            database_url: None,
            data_file: DEFAULT_DATA_FILE.into(),
            photo_dir: DEFAULT_PHOTO_DIR.into(),
            staff_token: None,
            expiring_window_days: DEFAULT_EXPIRING_WINDOW_DAYS,
            expiry_sweep_secs: DEFAULT_EXPIRY_SWEEP_SECS,
        }
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

/// Reads a variable without surrounding whitespace, treating empty values
/// as unset.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .parse()
                .with_context(|| format!("{} has an invalid value: {}", name, value))
        })
        .transpose()
}
