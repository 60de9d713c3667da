//! Configuration for the `solana-pay` command-line tool.

use clap::Parser;
use serde::Deserialize;
use solana_pay::chain::SolanaChainConfig;
use solana_pay::poll::Poller;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::run::Command;

/// CLI arguments for the `solana-pay` tool.
#[derive(Parser, Debug)]
#[command(name = "solana-pay")]
#[command(about = "Solana Pay transfer requests: encode, build, broadcast and validate")]
pub struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(long, short, global = true, env = "CONFIG", default_value = "config.json")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

/// Tool configuration.
///
/// ```json
/// {
///   "rpc": "$SOLANA_RPC_URL",
///   "finality": "finalized",
///   "poll": { "intervalMs": 500, "maxAttempts": 240 }
/// }
/// ```
///
/// Every field is optional. The RPC endpoint falls back to `$SOLANA_RPC_URL`,
/// then to mainnet-beta.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(flatten)]
    chain: SolanaChainConfig,
    #[serde(default)]
    poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    #[serde(default = "config_defaults::default_interval_ms")]
    interval_ms: u64,
    #[serde(default)]
    max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: config_defaults::default_interval_ms(),
            max_attempts: None,
        }
    }
}

impl PollConfig {
    pub fn poller(&self) -> Poller {
        let poller = Poller::new(Duration::from_millis(self.interval_ms));
        match self.max_attempts {
            Some(max_attempts) => poller.with_max_attempts(max_attempts),
            None => poller,
        }
    }
}

pub mod config_defaults {
    pub const DEFAULT_INTERVAL_MS: u64 = 250;

    pub fn default_interval_ms() -> u64 {
        DEFAULT_INTERVAL_MS
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    pub fn chain(&self) -> &SolanaChainConfig {
        &self.chain
    }

    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }

    /// Loads the configuration file at `path`.
    ///
    /// A missing file yields the defaults. Values absent from the file are
    /// resolved from environment variables or defaults during deserialization.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::FileRead(path.to_path_buf(), e)),
        }
    }
}
