use solana_instruction::{AccountMeta, Instruction};
use solana_pay_types::amount::Amount;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_system_interface::instruction::SystemInstruction;

use crate::chain::Address;
use crate::chain::ledger::{LedgerLike, SettledTransaction, SettlementMeta, TokenBalance};
use crate::chain::token::{TokenProgram, associated_token_address};
use crate::chain::types::{MEMO_PROGRAM_PUBKEY, NATIVE_DECIMALS, SYSTEM_PROGRAM_PUBKEY};
use crate::request::PaymentRequest;
use crate::transfer::message::{account_keys, decompile_instructions};
use crate::transfer::types::ValidateTransferError;

/// Checks that the settled transaction behind `signature` pays `request`.
///
/// On success the settled transaction is returned as proof. A transaction the
/// ledger does not know yet, or whose metadata is not indexed yet, fails with
/// a retryable error (see [`ValidateTransferError::is_retryable`]); callers
/// poll until it settles. Nothing is written to the ledger, so repeated calls
/// give the same answer for the same ledger state.
pub async fn validate_transfer<L: LedgerLike>(
    ledger: &L,
    signature: &Signature,
    request: &PaymentRequest,
) -> Result<SettledTransaction, ValidateTransferError> {
    let settled = ledger
        .get_settled_transaction(signature)
        .await?
        .ok_or(ValidateTransferError::NotFound)?;
    let result = verify_settled_transfer(&settled, request);

    #[cfg(feature = "telemetry")]
    match &result {
        Ok(()) => tracing::info!(%signature, slot = settled.slot, "Transfer validated"),
        Err(e) => tracing::debug!(%signature, error = %e, "Transfer not valid"),
    }

    result.map(|()| settled)
}

/// Checks an already fetched settled transaction against `request`.
///
/// The last instruction must be the transfer; when a memo is requested, the
/// instruction before it must be that memo.
pub fn verify_settled_transfer(
    settled: &SettledTransaction,
    request: &PaymentRequest,
) -> Result<(), ValidateTransferError> {
    let meta = settled
        .meta
        .as_ref()
        .ok_or(ValidateTransferError::MissingMeta)?;
    if let Some(err) = &meta.err {
        return Err(ValidateTransferError::TransactionFailed(err.clone()));
    }

    let message = &settled.transaction.message;
    let keys = account_keys(message, &meta.loaded_addresses);
    let mut instructions = decompile_instructions(message, &meta.loaded_addresses)?;

    let transfer = instructions
        .pop()
        .ok_or(ValidateTransferError::MissingTransferInstruction)?;
    match (transfer.accounts.first(), transfer.accounts.get(1)) {
        (Some(first), Some(second)) if first.pubkey == second.pubkey => {
            return Err(ValidateTransferError::SenderIsRecipient);
        }
        (Some(_), Some(_)) => {}
        _ => return Err(ValidateTransferError::InvalidTransfer),
    }

    let (pre, post) = match &request.spl_token {
        None => verify_native_transfer(&transfer, &keys, meta, request)?,
        Some(mint) => verify_token_transfer(&transfer, &keys, meta, mint.pubkey(), request)?,
    };
    let transferred = post
        .checked_sub(&pre)
        .ok_or(ValidateTransferError::AmountNotTransferred)?;
    if transferred < request.amount {
        return Err(ValidateTransferError::AmountNotTransferred);
    }

    if let Some(memo) = &request.memo {
        let instruction = instructions
            .pop()
            .ok_or(ValidateTransferError::MissingMemoInstruction)?;
        verify_memo(&instruction, memo)?;
    }

    Ok(())
}

/// Returns the recipient's native balance before and after the transaction.
fn verify_native_transfer(
    transfer: &Instruction,
    keys: &[Pubkey],
    meta: &SettlementMeta,
    request: &PaymentRequest,
) -> Result<(Amount, Amount), ValidateTransferError> {
    let index = keys
        .iter()
        .position(|key| request.recipient == *key)
        .ok_or(ValidateTransferError::RecipientNotFound)?;

    if !request.references.is_empty() {
        if !is_system_transfer(transfer) {
            return Err(ValidateTransferError::InvalidTransfer);
        }
        verify_references(&transfer.accounts[2..], &request.references)?;
    }

    let lamports = |balances: &[u64]| {
        let units = balances.get(index).copied().unwrap_or(0);
        Amount::from_base_units(units, NATIVE_DECIMALS)
            .map_err(|_| ValidateTransferError::AmountNotTransferred)
    };
    Ok((lamports(&meta.pre_balances)?, lamports(&meta.post_balances)?))
}

/// Returns the balance of the recipient's token account before and after the transaction.
fn verify_token_transfer(
    transfer: &Instruction,
    keys: &[Pubkey],
    meta: &SettlementMeta,
    mint: &Pubkey,
    request: &PaymentRequest,
) -> Result<(Amount, Amount), ValidateTransferError> {
    let token_program =
        TokenProgram::from_owner(&transfer.program_id).unwrap_or(TokenProgram::Token);
    let destination =
        associated_token_address(request.recipient.pubkey(), mint, &token_program.id());
    let index = keys
        .iter()
        .position(|key| *key == destination)
        .ok_or(ValidateTransferError::RecipientNotFound)?;

    if !request.references.is_empty() {
        let first_reference = token_transfer_signers_offset(transfer, token_program)
            .ok_or(ValidateTransferError::InvalidTransfer)?;
        let signers = transfer.accounts.get(first_reference..).unwrap_or_default();
        verify_references(signers, &request.references)?;
    }

    let balance = |balances: &[TokenBalance]| {
        balances
            .iter()
            .find(|balance| usize::from(balance.account_index) == index)
            .map(|balance| Amount::from_base_units(balance.amount, balance.decimals))
            .transpose()
            .map(|amount| amount.unwrap_or(Amount::ZERO))
            .map_err(|_| ValidateTransferError::AmountNotTransferred)
    };
    Ok((
        balance(&meta.pre_token_balances)?,
        balance(&meta.post_token_balances)?,
    ))
}

fn is_system_transfer(instruction: &Instruction) -> bool {
    instruction.program_id == SYSTEM_PROGRAM_PUBKEY
        && matches!(
            bincode::deserialize::<SystemInstruction>(&instruction.data),
            Ok(SystemInstruction::Transfer { .. })
        )
}

/// Index of the first multisig signer account of a token `Transfer` or
/// `TransferChecked` instruction, `None` for anything else.
///
/// References ride in the multisig signer slots, after
/// `[source, destination, authority]` for `Transfer` and
/// `[source, mint, destination, authority]` for `TransferChecked`.
fn token_transfer_signers_offset(
    instruction: &Instruction,
    token_program: TokenProgram,
) -> Option<usize> {
    if instruction.program_id != token_program.id() {
        return None;
    }
    match token_program {
        TokenProgram::Token => {
            use spl_token::instruction::TokenInstruction;
            match TokenInstruction::unpack(&instruction.data).ok()? {
                #[allow(deprecated)]
                TokenInstruction::Transfer { .. } => Some(3),
                TokenInstruction::TransferChecked { .. } => Some(4),
                _ => None,
            }
        }
        TokenProgram::Token2022 => {
            use spl_token_2022::instruction::TokenInstruction;
            match TokenInstruction::unpack(&instruction.data).ok()? {
                #[allow(deprecated)]
                TokenInstruction::Transfer { .. } => Some(3),
                TokenInstruction::TransferChecked { .. } => Some(4),
                _ => None,
            }
        }
    }
}

/// Requested references must appear position by position at the start of `accounts`.
///
/// Extra trailing accounts are not rejected.
fn verify_references(
    accounts: &[AccountMeta],
    references: &[Address],
) -> Result<(), ValidateTransferError> {
    for (i, reference) in references.iter().enumerate() {
        match accounts.get(i) {
            Some(account) if *reference == account.pubkey => {}
            _ => return Err(ValidateTransferError::InvalidReference(i)),
        }
    }
    Ok(())
}

fn verify_memo(instruction: &Instruction, memo: &str) -> Result<(), ValidateTransferError> {
    if instruction.program_id != MEMO_PROGRAM_PUBKEY {
        return Err(ValidateTransferError::InvalidMemoProgram);
    }
    if !instruction.accounts.is_empty() {
        return Err(ValidateTransferError::InvalidMemoKeys);
    }
    if instruction.data != memo.as_bytes() {
        return Err(ValidateTransferError::InvalidMemo);
    }
    Ok(())
}
