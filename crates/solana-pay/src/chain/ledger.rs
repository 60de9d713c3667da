//! The ledger capability set the transfer builder and validator run against.
//!
//! Everything the core needs from a cluster goes through [`LedgerLike`]: account
//! lookups, the latest blockhash, fee estimates, settled transactions and
//! signature searches. [`crate::chain::SolanaChainProvider`] implements it over
//! JSON-RPC; tests implement it in memory.

use solana_account::Account;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_response::UiTransactionError;
use solana_message::v0::LoadedAddresses;
use solana_message::{Hash, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::sync::Arc;

/// Errors raised while talking to the ledger.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(Box<ClientErrorKind>),
    /// The ledger answered with data that could not be decoded.
    #[error("Can not decode ledger response: {0}")]
    Decoding(String),
}

impl From<ClientError> for LedgerError {
    fn from(value: ClientError) -> Self {
        LedgerError::Transport(value.kind)
    }
}

/// A transaction as recorded by the ledger once it has been confirmed.
#[derive(Debug, Clone)]
pub struct SettledTransaction {
    pub slot: u64,
    pub block_time: Option<i64>,
    /// The signed transaction with its compiled message.
    pub transaction: VersionedTransaction,
    /// Execution metadata. Absent while the node has not indexed it yet.
    pub meta: Option<SettlementMeta>,
}

impl SettledTransaction {
    /// The fee payer's signature, which identifies the transaction.
    pub fn signature(&self) -> Option<&Signature> {
        self.transaction.signatures.first()
    }
}

/// Execution metadata of a settled transaction.
///
/// Balance arrays are indexed by account index: static message keys first,
/// then lookup-table addresses (writable, then readonly).
#[derive(Debug, Clone, Default)]
pub struct SettlementMeta {
    /// Set when the transaction failed on-chain.
    pub err: Option<UiTransactionError>,
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    /// Addresses loaded from lookup tables by a v0 message.
    pub loaded_addresses: LoadedAddresses,
}

/// Token balance of one account index before or after execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: Pubkey,
    pub owner: Option<Pubkey>,
    /// Raw amount in base units.
    pub amount: u64,
    pub decimals: u8,
}

/// Ledger operations used by the transfer builder, validator and reference lookup.
pub trait LedgerLike {
    /// Fetches an account, `None` if it does not exist.
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, LedgerError>> + Send;

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, LedgerError>> + Send;

    /// Estimates the fee, in lamports, the cluster charges for a message.
    fn get_fee_for_message(
        &self,
        message: &VersionedMessage,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Fetches a settled transaction, `None` if the ledger has no record of it yet.
    fn get_settled_transaction(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<SettledTransaction>, LedgerError>> + Send;

    /// Signatures of transactions that mention `address`, newest first,
    /// starting strictly before `before` when given.
    fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Signature>, LedgerError>> + Send;

    /// Broadcasts a signed transaction without waiting for confirmation.
    fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, LedgerError>> + Send;
}

impl<T: LedgerLike> LedgerLike for Arc<T> {
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, LedgerError>> + Send {
        (**self).get_account(pubkey)
    }

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, LedgerError>> + Send {
        (**self).get_latest_blockhash()
    }

    fn get_fee_for_message(
        &self,
        message: &VersionedMessage,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).get_fee_for_message(message)
    }

    fn get_settled_transaction(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<SettledTransaction>, LedgerError>> + Send {
        (**self).get_settled_transaction(signature)
    }

    fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Signature>, LedgerError>> + Send {
        (**self).get_signatures_for_address(address, before, limit)
    }

    fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, LedgerError>> + Send {
        (**self).send_transaction(transaction)
    }
}
