//! In-memory ledger and account fixtures for unit tests.

use solana_account::Account;
use solana_message::{Hash, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccountState, AccountState, Mint as MintState};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::chain::ledger::{LedgerError, LedgerLike, SettledTransaction, SettlementMeta};
use crate::chain::types::SYSTEM_PROGRAM_PUBKEY;
use crate::transfer::TransferTransaction;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Deterministic test key. `key(0)` is the system program, avoid it.
pub fn key(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

pub fn wallet_account(lamports: u64) -> Account {
    Account {
        lamports,
        data: Vec::new(),
        owner: SYSTEM_PROGRAM_PUBKEY,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn mint_account(decimals: u8, initialized: bool) -> Account {
    let state = MintState {
        decimals,
        is_initialized: initialized,
        supply: 1_000_000_000_000,
        ..MintState::default()
    };
    let mut data = vec![0u8; MintState::LEN];
    state.pack_into_slice(&mut data);
    Account {
        lamports: 1_461_600,
        data,
        owner: spl_token::ID,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn token_account(mint: Pubkey, owner: Pubkey, amount: u64, state: AccountState) -> Account {
    let state = TokenAccountState {
        mint,
        owner,
        amount,
        state,
        ..TokenAccountState::default()
    };
    let mut data = vec![0u8; TokenAccountState::LEN];
    state.pack_into_slice(&mut data);
    Account {
        lamports: 2_039_280,
        data,
        owner: spl_token::ID,
        executable: false,
        rent_epoch: 0,
    }
}

/// Settles `tx` with the native balance of `account` going from `pre` to `post`.
pub fn settle_native(
    tx: &TransferTransaction,
    account: Pubkey,
    pre: u64,
    post: u64,
) -> SettledTransaction {
    let transaction = tx.to_versioned_transaction().unwrap();
    let keys = transaction.message.static_account_keys();
    let mut meta = SettlementMeta {
        fee: 5_000,
        pre_balances: vec![LAMPORTS_PER_SOL; keys.len()],
        post_balances: vec![LAMPORTS_PER_SOL; keys.len()],
        ..SettlementMeta::default()
    };
    if let Some(index) = keys.iter().position(|key| *key == account) {
        meta.pre_balances[index] = pre;
        meta.post_balances[index] = post;
    }
    SettledTransaction {
        slot: 42,
        block_time: Some(1_700_000_000),
        transaction,
        meta: Some(meta),
    }
}

/// A ledger backed by hash maps.
#[derive(Debug)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    transactions: Mutex<HashMap<Signature, SettledTransaction>>,
    /// Newest first, like `getSignaturesForAddress`.
    signatures: Mutex<HashMap<Pubkey, Vec<Signature>>>,
    blockhash: Hash,
    fee: u64,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self {
            accounts: Mutex::default(),
            transactions: Mutex::default(),
            signatures: Mutex::default(),
            blockhash: Hash::new_from_array([7; 32]),
            fee: 5_000,
        }
    }
}

impl MemoryLedger {
    pub fn insert_account(&self, pubkey: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(pubkey, account);
    }

    pub fn insert_settled(&self, signature: Signature, transaction: SettledTransaction) {
        self.transactions
            .lock()
            .unwrap()
            .insert(signature, transaction);
    }

    /// Records `signature` as the newest transaction mentioning `address`.
    pub fn push_signature(&self, address: Pubkey, signature: Signature) {
        self.signatures
            .lock()
            .unwrap()
            .entry(address)
            .or_default()
            .insert(0, signature);
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }
}

impl LedgerLike for MemoryLedger {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, LedgerError> {
        Ok(self.accounts.lock().unwrap().get(pubkey).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(self.blockhash())
    }

    async fn get_fee_for_message(&self, message: &VersionedMessage) -> Result<u64, LedgerError> {
        let signers = u64::from(message.header().num_required_signatures);
        Ok(self.fee * signers)
    }

    async fn get_settled_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<SettledTransaction>, LedgerError> {
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<Signature>, LedgerError> {
        let signatures = self.signatures.lock().unwrap();
        let Some(all) = signatures.get(address) else {
            return Ok(Vec::new());
        };
        let start = match before {
            Some(before) => match all.iter().position(|s| *s == before) {
                Some(position) => position + 1,
                None => return Ok(Vec::new()),
            },
            None => 0,
        };
        Ok(all.iter().skip(start).take(limit).copied().collect())
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, LedgerError> {
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }
}
