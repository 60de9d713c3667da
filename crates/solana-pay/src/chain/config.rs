use serde::{Deserialize, Serialize};
use solana_commitment_config::CommitmentConfig;
use solana_pay_types::config::LiteralOrEnv;
use url::Url;

/// How settled a transaction must be before the ledger reports it.
///
/// Settled transactions are never read at `processed` commitment: a processed
/// block can still be skipped, which would let a payment "disappear" after it
/// was accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    #[default]
    Confirmed,
    Finalized,
}

impl Finality {
    pub fn commitment(&self) -> CommitmentConfig {
        match self {
            Finality::Confirmed => CommitmentConfig::confirmed(),
            Finality::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Connection settings for a Solana cluster.
///
/// ```json
/// {
///   "rpc": "$SOLANA_RPC_URL",
///   "finality": "finalized"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaChainConfig {
    /// JSON-RPC endpoint. Literal URL or `$ENV_VAR` reference.
    #[serde(default = "solana_chain_config::default_rpc")]
    pub rpc: LiteralOrEnv<Url>,
    #[serde(default)]
    pub finality: Finality,
}

impl SolanaChainConfig {
    pub fn rpc(&self) -> &Url {
        self.rpc.inner()
    }

    pub fn finality(&self) -> Finality {
        self.finality
    }
}

impl Default for SolanaChainConfig {
    fn default() -> Self {
        Self {
            rpc: solana_chain_config::default_rpc(),
            finality: Finality::default(),
        }
    }
}

pub mod solana_chain_config {
    use super::*;

    pub const DEFAULT_RPC: &str = "https://api.mainnet-beta.solana.com";

    /// Returns the default RPC endpoint with fallback: $SOLANA_RPC_URL env var -> mainnet-beta
    pub fn default_rpc() -> LiteralOrEnv<Url> {
        let url = std::env::var("SOLANA_RPC_URL")
            .ok()
            .and_then(|s| Url::parse(&s).ok())
            .unwrap_or_else(|| Url::parse(DEFAULT_RPC).expect("valid default RPC url"));
        LiteralOrEnv::from_literal(url)
    }
}
