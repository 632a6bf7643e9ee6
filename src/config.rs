use anyhow::Context;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    pub content_store: ContentStoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
}

/// Where uploaded audio files are kept
#[derive(Debug, Deserialize, Clone)]
pub struct ContentStoreConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct IngestConfig {
    /// upper bound for a single create or update, unbounded when missing
    pub timeout_secs: Option<u64>,
}

impl IngestConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
