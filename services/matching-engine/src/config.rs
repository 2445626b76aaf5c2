//! Engine configuration
//!
//! An engine serves one trading pair and owns one journal directory.
//! Starting balances come from a JSON seed file:
//! `[{"user": "A", "asset": "X", "amount": "10"}]`.

use persistence::JournalConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::account::SeedBalance;
use types::ids::TradingPair;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pair: TradingPair,
    pub journal: JournalConfig,
}

impl EngineConfig {
    /// Default journal settings (fsync on every append) under `journal_dir`
    pub fn new(pair: TradingPair, journal_dir: impl Into<PathBuf>) -> Self {
        Self {
            pair,
            journal: JournalConfig::new(journal_dir),
        }
    }
}

pub fn load_seed(path: &Path) -> Result<Vec<SeedBalance>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
