use serde_json::json;
use solana_account::Account;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_client::rpc_request::RpcRequest;
use solana_commitment_config::CommitmentConfig;
use solana_message::v0::LoadedAddresses;
use solana_message::{Hash, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use solana_transaction_status_client_types::{
    EncodedConfirmedTransactionWithStatusMeta, UiLoadedAddresses, UiTransactionEncoding,
    UiTransactionStatusMeta, UiTransactionTokenBalance,
};
use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::chain::config::{Finality, SolanaChainConfig};
use crate::chain::ledger::{
    LedgerError, LedgerLike, SettledTransaction, SettlementMeta, TokenBalance,
};

/// JSON-RPC backed ledger.
///
/// Reads are made at the configured [`Finality`]. Transactions are fetched
/// base64-encoded and decoded locally so the validator works on the exact
/// compiled message that was signed.
///
/// # Example
///
/// ```ignore
/// use solana_pay::chain::{SolanaChainConfig, SolanaChainProvider};
///
/// let provider = SolanaChainProvider::from_config(&SolanaChainConfig::default());
/// let blockhash = provider.get_latest_blockhash().await?;
/// ```
pub struct SolanaChainProvider {
    rpc_client: Arc<RpcClient>,
    finality: Finality,
}

impl Debug for SolanaChainProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaChainProvider")
            .field("rpc_url", &self.rpc_client.url())
            .field("finality", &self.finality)
            .finish()
    }
}

impl SolanaChainProvider {
    pub fn new(rpc_url: String, finality: Finality) -> Self {
        #[cfg(feature = "telemetry")]
        tracing::info!(rpc = rpc_url, finality = ?finality, "Using Solana provider");
        let rpc_client = RpcClient::new_with_commitment(rpc_url, finality.commitment());
        Self {
            rpc_client: Arc::new(rpc_client),
            finality,
        }
    }

    pub fn from_config(config: &SolanaChainConfig) -> Self {
        Self::new(config.rpc().to_string(), config.finality())
    }

    /// Returns a cloned reference to the RPC client.
    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.rpc_client)
    }

    fn commitment(&self) -> CommitmentConfig {
        self.finality.commitment()
    }
}

impl LedgerLike for SolanaChainProvider {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, LedgerError> {
        let response = self
            .rpc_client
            .get_account_with_commitment(pubkey, self.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let (blockhash, _last_valid_block_height) = self
            .rpc_client
            .get_latest_blockhash_with_commitment(self.commitment())
            .await?;
        Ok(blockhash)
    }

    async fn get_fee_for_message(&self, message: &VersionedMessage) -> Result<u64, LedgerError> {
        let fee = match message {
            VersionedMessage::Legacy(message) => {
                self.rpc_client.get_fee_for_message(message).await?
            }
            VersionedMessage::V0(message) => self.rpc_client.get_fee_for_message(message).await?,
        };
        Ok(fee)
    }

    async fn get_settled_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<SettledTransaction>, LedgerError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment()),
            max_supported_transaction_version: Some(0),
        };
        // Unknown signatures come back as a `null` result.
        let response = self
            .rpc_client
            .send::<Option<EncodedConfirmedTransactionWithStatusMeta>>(
                RpcRequest::GetTransaction,
                json!([signature.to_string(), config]),
            )
            .await;
        match response {
            Ok(Some(encoded)) => settled_transaction(encoded).map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %e, %signature, "getTransaction failed");
                Err(e.into())
            }
        }
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<Signature>, LedgerError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            until: None,
            limit: Some(limit),
            commitment: Some(self.commitment()),
        };
        let statuses = self
            .rpc_client
            .get_signatures_for_address_with_config(address, config)
            .await?;
        statuses
            .iter()
            .map(|status| {
                Signature::from_str(&status.signature).map_err(|e| {
                    LedgerError::Decoding(format!("invalid signature {}: {e}", status.signature))
                })
            })
            .collect()
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, LedgerError> {
        let signature = self
            .rpc_client
            .send_transaction_with_config(
                transaction,
                RpcSendTransactionConfig {
                    preflight_commitment: Some(self.commitment().commitment),
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await?;
        Ok(signature)
    }
}

fn settled_transaction(
    encoded: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<SettledTransaction, LedgerError> {
    let transaction = encoded.transaction.transaction.decode().ok_or_else(|| {
        LedgerError::Decoding("transaction is not in a binary encoding".to_string())
    })?;
    let meta = encoded.transaction.meta.map(settlement_meta).transpose()?;
    Ok(SettledTransaction {
        slot: encoded.slot,
        block_time: encoded.block_time,
        transaction,
        meta,
    })
}

fn settlement_meta(meta: UiTransactionStatusMeta) -> Result<SettlementMeta, LedgerError> {
    let pre_token_balances: Option<Vec<UiTransactionTokenBalance>> = meta.pre_token_balances.into();
    let post_token_balances: Option<Vec<UiTransactionTokenBalance>> =
        meta.post_token_balances.into();
    let loaded_addresses: Option<UiLoadedAddresses> = meta.loaded_addresses.into();
    let loaded_addresses = match loaded_addresses {
        Some(loaded) => LoadedAddresses {
            writable: parse_pubkeys(&loaded.writable)?,
            readonly: parse_pubkeys(&loaded.readonly)?,
        },
        None => LoadedAddresses::default(),
    };
    Ok(SettlementMeta {
        err: meta.err,
        fee: meta.fee,
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        pre_token_balances: token_balances(pre_token_balances.unwrap_or_default())?,
        post_token_balances: token_balances(post_token_balances.unwrap_or_default())?,
        loaded_addresses,
    })
}

fn token_balances(
    balances: Vec<UiTransactionTokenBalance>,
) -> Result<Vec<TokenBalance>, LedgerError> {
    balances
        .into_iter()
        .map(|balance| {
            let owner: Option<String> = balance.owner.into();
            let amount = balance.ui_token_amount.amount.parse::<u64>().map_err(|e| {
                LedgerError::Decoding(format!(
                    "invalid token amount {}: {e}",
                    balance.ui_token_amount.amount
                ))
            })?;
            Ok(TokenBalance {
                account_index: balance.account_index,
                mint: parse_pubkey(&balance.mint)?,
                owner: owner.as_deref().map(parse_pubkey).transpose()?,
                amount,
                decimals: balance.ui_token_amount.decimals,
            })
        })
        .collect()
}

fn parse_pubkey(s: &str) -> Result<Pubkey, LedgerError> {
    Pubkey::from_str(s).map_err(|_| LedgerError::Decoding(format!("invalid address {s}")))
}

fn parse_pubkeys(keys: &[String]) -> Result<Vec<Pubkey>, LedgerError> {
    keys.iter().map(|key| parse_pubkey(key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_client::client_error::ClientErrorKind;
    use solana_client::nonblocking::rpc_client::Mocks;

    fn mocked_provider(get_transaction: serde_json::Value) -> SolanaChainProvider {
        let mut mocks = Mocks::new();
        mocks.insert(RpcRequest::GetTransaction, get_transaction);
        SolanaChainProvider {
            rpc_client: Arc::new(RpcClient::new_mock_with_mocks("succeeds".to_string(), mocks)),
            finality: Finality::Confirmed,
        }
    }

    #[tokio::test]
    async fn test_unknown_signature_is_none() {
        let provider = mocked_provider(serde_json::Value::Null);
        let settled = provider
            .get_settled_transaction(&Signature::from([3u8; 64]))
            .await
            .unwrap();
        assert!(settled.is_none());
    }

    #[tokio::test]
    async fn test_malformed_transaction_is_an_error() {
        let provider = mocked_provider(json!({ "unexpected": true }));
        let err = provider
            .get_settled_transaction(&Signature::from([3u8; 64]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Transport(kind) if matches!(*kind, ClientErrorKind::SerdeJson(_))
        ));
    }
}
