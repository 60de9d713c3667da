//! SPL token state as seen by the transfer builder.
//!
//! Mints and token accounts are read through [`LedgerLike::get_account`] and
//! decoded from the base SPL layout, which Token-2022 shares with the classic
//! Token program (extensions are appended after it).

use solana_pubkey::Pubkey;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccountState, AccountState, Mint as MintState};

use crate::chain::ledger::{LedgerError, LedgerLike};
use crate::chain::types::ATA_PROGRAM_PUBKEY;

/// The token program owning a mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProgram {
    Token,
    Token2022,
}

impl TokenProgram {
    pub fn from_owner(owner: &Pubkey) -> Option<Self> {
        if *owner == spl_token::ID {
            Some(TokenProgram::Token)
        } else if *owner == spl_token_2022::ID {
            Some(TokenProgram::Token2022)
        } else {
            None
        }
    }

    pub fn id(&self) -> Pubkey {
        match self {
            TokenProgram::Token => spl_token::ID,
            TokenProgram::Token2022 => spl_token_2022::ID,
        }
    }
}

/// Mint information needed to build a checked transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintInfo {
    pub token_program: TokenProgram,
    pub initialized: bool,
    pub decimals: u8,
}

/// Token account state relevant to a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountInfo {
    pub initialized: bool,
    pub frozen: bool,
    /// Balance in base units.
    pub amount: u64,
}

/// Derives the associated token account of `owner` for `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    let (ata, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    );
    ata
}

/// Fetches a mint.
///
/// Returns `None` when the account does not exist or is not owned by a token program.
pub async fn fetch_mint<L: LedgerLike>(
    ledger: &L,
    mint: &Pubkey,
) -> Result<Option<MintInfo>, LedgerError> {
    let Some(account) = ledger.get_account(mint).await? else {
        return Ok(None);
    };
    let Some(token_program) = TokenProgram::from_owner(&account.owner) else {
        return Ok(None);
    };
    let base = account
        .data
        .get(..MintState::LEN)
        .ok_or_else(|| LedgerError::Decoding(format!("mint {mint} data is too short")))?;
    let state = MintState::unpack_unchecked(base)
        .map_err(|e| LedgerError::Decoding(format!("failed to unpack mint {mint}: {e}")))?;
    Ok(Some(MintInfo {
        token_program,
        initialized: state.is_initialized,
        decimals: state.decimals,
    }))
}

/// Fetches a token account, `None` if it does not exist.
pub async fn fetch_token_account<L: LedgerLike>(
    ledger: &L,
    address: &Pubkey,
) -> Result<Option<TokenAccountInfo>, LedgerError> {
    let Some(account) = ledger.get_account(address).await? else {
        return Ok(None);
    };
    let base = account.data.get(..TokenAccountState::LEN).ok_or_else(|| {
        LedgerError::Decoding(format!("token account {address} data is too short"))
    })?;
    let state = TokenAccountState::unpack_unchecked(base).map_err(|e| {
        LedgerError::Decoding(format!("failed to unpack token account {address}: {e}"))
    })?;
    Ok(Some(TokenAccountInfo {
        initialized: state.state != AccountState::Uninitialized,
        frozen: state.state == AccountState::Frozen,
        amount: state.amount,
    }))
}
