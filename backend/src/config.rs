use std::{env, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use url::Url;

const DEFAULT_DB_PATH: &str = "data/songs.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_MUSIC_API_URL: &str = "http://localhost:8081";

/// Process configuration, read once at startup and never mutated.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: String,
    pub port: u16,
    pub music_api_url: Url,
    /// `None` leaves the outbound lookup without a client-side timeout.
    pub music_api_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read("SONGS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let bind_addr = read("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let port = match read("SERVER_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid SERVER_PORT: {raw}"))?,
            None => DEFAULT_SERVER_PORT,
        };

        let raw_url = read("MUSIC_API_URL").unwrap_or_else(|| DEFAULT_MUSIC_API_URL.to_string());
        let music_api_url =
            Url::parse(&raw_url).with_context(|| format!("invalid MUSIC_API_URL: {raw_url}"))?;
        if !matches!(music_api_url.scheme(), "http" | "https") {
            bail!("MUSIC_API_URL must be an http(s) URL, got {raw_url}");
        }

        let music_api_timeout = match read("MUSIC_API_TIMEOUT_SECONDS") {
            Some(raw) => {
                let seconds = raw
                    .parse::<u64>()
                    .with_context(|| format!("invalid MUSIC_API_TIMEOUT_SECONDS: {raw}"))?;
                Some(Duration::from_secs(seconds.max(1)))
            },
            None => None,
        };

        Ok(Self {
            db_path,
            bind_addr,
            port,
            music_api_url,
            music_api_timeout,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
