use solana_account::Account;
use solana_pubkey::Pubkey;

use crate::chain::ledger::LedgerLike;
use crate::chain::token::{
    TokenAccountInfo, associated_token_address, fetch_mint, fetch_token_account,
};
use crate::chain::types::{NATIVE_DECIMALS, SYSTEM_PROGRAM_PUBKEY};
use crate::request::PaymentRequest;
use crate::transfer::types::{
    CreateTransferError, TransferInstruction, TransferTransaction, memo_instruction,
};

/// Builds the unsigned transaction paying `request` from `payer`.
///
/// Native SOL is moved with a system transfer between the two wallets; tokens
/// with a `TransferChecked` between their associated token accounts. The
/// request's references are appended to the transfer instruction as
/// read-only, non-signing accounts, in the given order. A memo, if any, goes
/// in its own instruction just before the transfer.
///
/// Only reads the ledger. The recent blockhash is fetched last so that it is as
/// fresh as possible when the transaction reaches the wallet.
pub async fn create_transfer<L: LedgerLike>(
    ledger: &L,
    payer: &Pubkey,
    request: &PaymentRequest,
) -> Result<TransferTransaction, CreateTransferError> {
    let transfer = match &request.spl_token {
        None => create_native_transfer(ledger, payer, request).await?,
        Some(mint) => create_token_transfer(ledger, payer, mint.pubkey(), request).await?,
    };

    let references: Vec<Pubkey> = request.references.iter().map(|r| *r.pubkey()).collect();
    let mut instructions = Vec::with_capacity(2);
    if let Some(memo) = &request.memo {
        instructions.push(memo_instruction(memo));
    }
    instructions.push(transfer.to_instruction(&references)?);

    let recent_blockhash = ledger.get_latest_blockhash().await?;

    #[cfg(feature = "telemetry")]
    tracing::debug!(
        payer = %payer,
        recipient = %request.recipient,
        base_units = transfer.base_units(),
        references = references.len(),
        memo = request.memo.is_some(),
        blockhash = %recent_blockhash,
        "Built transfer"
    );

    Ok(TransferTransaction {
        transfer,
        instructions,
        fee_payer: *payer,
        recent_blockhash,
    })
}

async fn create_native_transfer<L: LedgerLike>(
    ledger: &L,
    payer: &Pubkey,
    request: &PaymentRequest,
) -> Result<TransferInstruction, CreateTransferError> {
    let recipient = request.recipient.pubkey();
    if payer == recipient {
        return Err(CreateTransferError::SenderIsRecipient);
    }

    let sender = ledger
        .get_account(payer)
        .await?
        .ok_or(CreateTransferError::SenderNotFound)?;
    check_wallet(
        &sender,
        CreateTransferError::SenderOwnerInvalid,
        CreateTransferError::SenderExecutable,
    )?;

    let recipient_account = ledger
        .get_account(recipient)
        .await?
        .ok_or(CreateTransferError::RecipientNotFound)?;
    check_wallet(
        &recipient_account,
        CreateTransferError::RecipientOwnerInvalid,
        CreateTransferError::RecipientExecutable,
    )?;

    let lamports = request.amount.to_base_units(NATIVE_DECIMALS)?;
    if lamports > sender.lamports {
        return Err(CreateTransferError::InsufficientFunds);
    }

    Ok(TransferInstruction::Native {
        from: *payer,
        to: *recipient,
        lamports,
    })
}

async fn create_token_transfer<L: LedgerLike>(
    ledger: &L,
    payer: &Pubkey,
    mint: &Pubkey,
    request: &PaymentRequest,
) -> Result<TransferInstruction, CreateTransferError> {
    let mint_info = fetch_mint(ledger, mint)
        .await?
        .ok_or(CreateTransferError::MintNotFound)?;
    if !mint_info.initialized {
        return Err(CreateTransferError::MintNotInitialized);
    }

    let amount = request.amount.to_base_units(mint_info.decimals)?;

    let token_program = mint_info.token_program.id();
    let source = associated_token_address(payer, mint, &token_program);
    let sender = fetch_token_account(ledger, &source).await?;
    let sender = check_token_account(
        sender,
        CreateTransferError::SenderNotInitialized,
        CreateTransferError::SenderFrozen,
    )?;

    let destination = associated_token_address(request.recipient.pubkey(), mint, &token_program);
    let recipient = fetch_token_account(ledger, &destination).await?;
    check_token_account(
        recipient,
        CreateTransferError::RecipientNotInitialized,
        CreateTransferError::RecipientFrozen,
    )?;

    if amount > sender.amount {
        return Err(CreateTransferError::InsufficientFunds);
    }

    Ok(TransferInstruction::Token {
        source,
        mint: *mint,
        destination,
        authority: *payer,
        amount,
        decimals: mint_info.decimals,
        token_program: mint_info.token_program,
    })
}

fn check_wallet(
    account: &Account,
    owner_invalid: CreateTransferError,
    executable: CreateTransferError,
) -> Result<(), CreateTransferError> {
    if account.owner != SYSTEM_PROGRAM_PUBKEY {
        return Err(owner_invalid);
    }
    if account.executable {
        return Err(executable);
    }
    Ok(())
}

fn check_token_account(
    account: Option<TokenAccountInfo>,
    not_initialized: CreateTransferError,
    frozen: CreateTransferError,
) -> Result<TokenAccountInfo, CreateTransferError> {
    let account = account
        .filter(|account| account.initialized)
        .ok_or(not_initialized)?;
    if account.frozen {
        return Err(frozen);
    }
    Ok(account)
}
