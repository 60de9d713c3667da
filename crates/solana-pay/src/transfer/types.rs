use solana_client::rpc_response::UiTransactionError;
use solana_instruction::{AccountMeta, Instruction};
use solana_message::v0::Message as MessageV0;
use solana_message::{CompileError, Hash, VersionedMessage};
use solana_pay_types::amount::AmountError;
use solana_pay_types::util::Base64Bytes;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_system_interface::instruction as system_instruction;
use solana_transaction::versioned::VersionedTransaction;

use crate::chain::ledger::LedgerError;
use crate::chain::token::TokenProgram;
use crate::chain::types::MEMO_PROGRAM_PUBKEY;
use crate::transfer::message::MessageError;

/// The single value-moving instruction of a transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferInstruction {
    /// System program transfer of lamports between two wallets.
    Native {
        from: Pubkey,
        to: Pubkey,
        lamports: u64,
    },
    /// `TransferChecked` between associated token accounts.
    Token {
        source: Pubkey,
        mint: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
        decimals: u8,
        token_program: TokenProgram,
    },
}

impl TransferInstruction {
    /// Encodes the instruction with `references` appended as read-only, non-signing accounts.
    pub fn to_instruction(
        &self,
        references: &[Pubkey],
    ) -> Result<Instruction, CreateTransferError> {
        let mut instruction = match self {
            TransferInstruction::Native { from, to, lamports } => {
                system_instruction::transfer(from, to, *lamports)
            }
            TransferInstruction::Token {
                source,
                mint,
                destination,
                authority,
                amount,
                decimals,
                token_program: TokenProgram::Token,
            } => spl_token::instruction::transfer_checked(
                &spl_token::ID,
                source,
                mint,
                destination,
                authority,
                &[],
                *amount,
                *decimals,
            )
            .map_err(|e| CreateTransferError::InvalidInstruction(format!("{e}")))?,
            TransferInstruction::Token {
                source,
                mint,
                destination,
                authority,
                amount,
                decimals,
                token_program: TokenProgram::Token2022,
            } => spl_token_2022::instruction::transfer_checked(
                &spl_token_2022::ID,
                source,
                mint,
                destination,
                authority,
                &[],
                *amount,
                *decimals,
            )
            .map_err(|e| CreateTransferError::InvalidInstruction(format!("{e}")))?,
        };
        instruction.accounts.extend(
            references
                .iter()
                .map(|reference| AccountMeta::new_readonly(*reference, false)),
        );
        Ok(instruction)
    }

    /// Amount moved, in base units of the asset.
    pub fn base_units(&self) -> u64 {
        match self {
            TransferInstruction::Native { lamports, .. } => *lamports,
            TransferInstruction::Token { amount, .. } => *amount,
        }
    }
}

/// A memo program instruction without accounts, carrying `memo` as UTF-8 data.
pub fn memo_instruction(memo: &str) -> Instruction {
    Instruction::new_with_bytes(MEMO_PROGRAM_PUBKEY, memo.as_bytes(), Vec::new())
}

/// An unsigned transfer transaction ready to be handed to a wallet.
///
/// `instructions` is `[memo?, transfer]`: the transfer is always last and the
/// memo, when present, immediately precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTransaction {
    pub transfer: TransferInstruction,
    pub instructions: Vec<Instruction>,
    pub fee_payer: Pubkey,
    pub recent_blockhash: Hash,
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeTransactionError {
    #[error("Can not compile message: {0:?}")]
    Compile(CompileError),
    #[error("Can not serialize transaction: {0}")]
    Serialize(#[from] bincode::Error),
}

impl TransferTransaction {
    pub fn message(&self) -> Result<VersionedMessage, EncodeTransactionError> {
        let message = MessageV0::try_compile(
            &self.fee_payer,
            &self.instructions,
            &[],
            self.recent_blockhash,
        )
        .map_err(EncodeTransactionError::Compile)?;
        Ok(VersionedMessage::V0(message))
    }

    /// The transaction with every signature slot left empty for the wallet to fill.
    pub fn to_versioned_transaction(&self) -> Result<VersionedTransaction, EncodeTransactionError> {
        let message = self.message()?;
        let num_required_signatures = message.header().num_required_signatures as usize;
        Ok(VersionedTransaction {
            signatures: vec![Signature::default(); num_required_signatures],
            message,
        })
    }

    pub fn to_base64(&self) -> Result<Base64Bytes, EncodeTransactionError> {
        let tx = self.to_versioned_transaction()?;
        let bytes = bincode::serialize(&tx)?;
        Ok(Base64Bytes::encode(bytes))
    }
}

impl From<AmountError> for CreateTransferError {
    fn from(value: AmountError) -> Self {
        match value {
            AmountError::WrongPrecision { .. } | AmountError::PrecisionLoss => {
                CreateTransferError::AmountDecimalsInvalid
            }
            AmountError::InvalidFormat | AmountError::OutOfRange => {
                CreateTransferError::AmountInvalid
            }
        }
    }
}

/// Reasons a transfer cannot be built. All are final for the given request.
#[derive(Debug, thiserror::Error)]
pub enum CreateTransferError {
    #[error("sender is also recipient")]
    SenderIsRecipient,
    #[error("sender not found")]
    SenderNotFound,
    #[error("sender owner invalid")]
    SenderOwnerInvalid,
    #[error("sender executable")]
    SenderExecutable,
    #[error("recipient not found")]
    RecipientNotFound,
    #[error("recipient owner invalid")]
    RecipientOwnerInvalid,
    #[error("recipient executable")]
    RecipientExecutable,
    #[error("amount decimals invalid")]
    AmountDecimalsInvalid,
    /// The amount does not fit the asset's integer representation.
    #[error("amount invalid")]
    AmountInvalid,
    #[error("mint not found")]
    MintNotFound,
    #[error("mint not initialized")]
    MintNotInitialized,
    #[error("sender not initialized")]
    SenderNotInitialized,
    #[error("sender frozen")]
    SenderFrozen,
    #[error("recipient not initialized")]
    RecipientNotInitialized,
    #[error("recipient frozen")]
    RecipientFrozen,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("invalid transfer instruction: {0}")]
    InvalidInstruction(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Reasons a settled transaction does not prove the requested payment.
///
/// [`ValidateTransferError::NotFound`] and [`ValidateTransferError::MissingMeta`]
/// mean the ledger has not caught up yet and the check should be repeated.
/// Everything else is final.
#[derive(Debug, thiserror::Error)]
pub enum ValidateTransferError {
    #[error("not found")]
    NotFound,
    #[error("missing meta")]
    MissingMeta,
    /// The transaction executed and failed on-chain.
    #[error("{0}")]
    TransactionFailed(UiTransactionError),
    #[error("missing transfer instruction")]
    MissingTransferInstruction,
    #[error("sender is also recipient")]
    SenderIsRecipient,
    #[error("recipient not found")]
    RecipientNotFound,
    /// The last instruction is not a system or token transfer.
    #[error("invalid transfer")]
    InvalidTransfer,
    #[error("invalid reference {0}")]
    InvalidReference(usize),
    #[error("amount not transferred")]
    AmountNotTransferred,
    #[error("missing memo instruction")]
    MissingMemoInstruction,
    #[error("invalid memo program")]
    InvalidMemoProgram,
    #[error("invalid memo keys")]
    InvalidMemoKeys,
    #[error("invalid memo")]
    InvalidMemo,
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ValidateTransferError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ValidateTransferError::NotFound | ValidateTransferError::MissingMeta
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::SYSTEM_PROGRAM_PUBKEY;
    use crate::testing::key;
    use solana_client::rpc_response::TransactionError;
    use solana_system_interface::instruction::SystemInstruction;

    #[test]
    fn test_native_instruction_layout() {
        let transfer = TransferInstruction::Native {
            from: key(1),
            to: key(2),
            lamports: 1_500_000_000,
        };
        let instruction = transfer.to_instruction(&[key(3), key(3)]).unwrap();
        assert_eq!(instruction.program_id, SYSTEM_PROGRAM_PUBKEY);
        let decoded: SystemInstruction = bincode::deserialize(&instruction.data).unwrap();
        assert_eq!(
            decoded,
            SystemInstruction::Transfer {
                lamports: 1_500_000_000
            }
        );
        assert_eq!(instruction.accounts.len(), 4);
        assert!(instruction.accounts[0].is_signer && instruction.accounts[0].is_writable);
        assert!(!instruction.accounts[1].is_signer && instruction.accounts[1].is_writable);
        for reference in &instruction.accounts[2..] {
            assert_eq!(reference.pubkey, key(3));
            assert!(!reference.is_signer);
            assert!(!reference.is_writable);
        }
    }

    #[test]
    fn test_token_instruction_is_checked_transfer() {
        let transfer = TransferInstruction::Token {
            source: key(4),
            mint: key(5),
            destination: key(6),
            authority: key(1),
            amount: 1_000,
            decimals: 2,
            token_program: TokenProgram::Token2022,
        };
        let instruction = transfer.to_instruction(&[key(9)]).unwrap();
        assert_eq!(instruction.program_id, spl_token_2022::ID);
        let keys: Vec<Pubkey> = instruction.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(keys, vec![key(4), key(5), key(6), key(1), key(9)]);
        let decoded = spl_token_2022::instruction::TokenInstruction::unpack(&instruction.data);
        assert!(matches!(
            decoded,
            Ok(spl_token_2022::instruction::TokenInstruction::TransferChecked {
                amount: 1_000,
                decimals: 2
            })
        ));
    }

    #[test]
    fn test_unsigned_transaction_has_empty_signature_slots() {
        let transfer = TransferInstruction::Native {
            from: key(1),
            to: key(2),
            lamports: 10,
        };
        let tx = TransferTransaction {
            instructions: vec![memo_instruction("hi"), transfer.to_instruction(&[]).unwrap()],
            transfer,
            fee_payer: key(1),
            recent_blockhash: Hash::new_from_array([7; 32]),
        };
        let versioned = tx.to_versioned_transaction().unwrap();
        assert_eq!(versioned.signatures, vec![Signature::default()]);
        assert_eq!(versioned.message.static_account_keys()[0], key(1));
        let encoded = tx.to_base64().unwrap();
        let decoded: VersionedTransaction =
            bincode::deserialize(&encoded.decode().unwrap()).unwrap();
        assert_eq!(decoded, versioned);
    }

    #[test]
    fn test_retryable_classes() {
        assert!(ValidateTransferError::NotFound.is_retryable());
        assert!(ValidateTransferError::MissingMeta.is_retryable());
        assert!(!ValidateTransferError::InvalidReference(0).is_retryable());
        assert!(
            !ValidateTransferError::TransactionFailed(UiTransactionError::from(
                TransactionError::InsufficientFundsForFee
            ))
            .is_retryable()
        );
        assert_eq!(
            ValidateTransferError::InvalidReference(2).to_string(),
            "invalid reference 2"
        );
    }
}
