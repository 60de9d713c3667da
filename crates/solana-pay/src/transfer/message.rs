//! Reconstruction of address-keyed instructions from a compiled message.
//!
//! A compiled message refers to accounts by index into its account key list:
//! static keys first, then addresses loaded from lookup tables (writable ones,
//! then readonly ones). Signer and writable flags are not stored per account;
//! they follow from where the index falls relative to the message header:
//!
//! ```text
//! static keys:  [ signed+writable | signed+readonly | unsigned+writable | unsigned+readonly ]
//!                 <-------- num_required_signatures -->
//!                          <- num_readonly_signed ->                   <- num_readonly_unsigned ->
//! loaded keys:  [ writable | readonly ]   (never signers)
//! ```

use solana_instruction::{AccountMeta, Instruction};
use solana_message::VersionedMessage;
use solana_message::v0::LoadedAddresses;
use solana_pubkey::Pubkey;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("account index {0} out of range")]
    InvalidAccountIndex(u8),
    #[error("program id index {0} out of range")]
    InvalidProgramIdIndex(u8),
}

/// All account keys the message can refer to, in index order.
pub fn account_keys(message: &VersionedMessage, loaded: &LoadedAddresses) -> Vec<Pubkey> {
    let static_keys = message.static_account_keys();
    match message {
        VersionedMessage::Legacy(_) => static_keys.to_vec(),
        VersionedMessage::V0(_) => {
            let capacity = static_keys.len() + loaded.writable.len() + loaded.readonly.len();
            let mut keys = Vec::with_capacity(capacity);
            keys.extend_from_slice(static_keys);
            keys.extend_from_slice(&loaded.writable);
            keys.extend_from_slice(&loaded.readonly);
            keys
        }
    }
}

fn is_signer(message: &VersionedMessage, index: usize) -> bool {
    index < usize::from(message.header().num_required_signatures)
}

fn is_writable(message: &VersionedMessage, loaded: &LoadedAddresses, index: usize) -> bool {
    let header = message.header();
    let num_static = message.static_account_keys().len();
    let num_required = usize::from(header.num_required_signatures);
    if index < num_required {
        let num_writable_signed =
            num_required.saturating_sub(usize::from(header.num_readonly_signed_accounts));
        return index < num_writable_signed;
    }
    if index < num_static {
        let num_writable_unsigned = num_static
            .saturating_sub(num_required)
            .saturating_sub(usize::from(header.num_readonly_unsigned_accounts));
        return index - num_required < num_writable_unsigned;
    }
    match message {
        VersionedMessage::Legacy(_) => false,
        VersionedMessage::V0(_) => index - num_static < loaded.writable.len(),
    }
}

/// Rebuilds every instruction of `message` with resolved account metas, in order.
pub fn decompile_instructions(
    message: &VersionedMessage,
    loaded: &LoadedAddresses,
) -> Result<Vec<Instruction>, MessageError> {
    let keys = account_keys(message, loaded);
    message
        .instructions()
        .iter()
        .map(|compiled| {
            let program_id = *keys
                .get(usize::from(compiled.program_id_index))
                .ok_or(MessageError::InvalidProgramIdIndex(compiled.program_id_index))?;
            let accounts = compiled
                .accounts
                .iter()
                .map(|&account_index| {
                    let index = usize::from(account_index);
                    let pubkey = *keys
                        .get(index)
                        .ok_or(MessageError::InvalidAccountIndex(account_index))?;
                    Ok(AccountMeta {
                        pubkey,
                        is_signer: is_signer(message, index),
                        is_writable: is_writable(message, loaded, index),
                    })
                })
                .collect::<Result<Vec<_>, MessageError>>()?;
            Ok(Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::key;
    use solana_message::compiled_instruction::CompiledInstruction;
    use solana_message::v0::Message as MessageV0;
    use solana_message::{Hash, Message, MessageHeader};

    #[test]
    fn test_round_trips_compiled_v0_message() {
        let payer = key(1);
        let instructions = vec![
            Instruction::new_with_bytes(key(20), b"memo", vec![]),
            Instruction {
                program_id: key(21),
                accounts: vec![
                    AccountMeta::new(payer, true),
                    AccountMeta::new_readonly(key(2), true),
                    AccountMeta::new(key(3), false),
                    AccountMeta::new_readonly(key(4), false),
                ],
                data: vec![1, 2, 3],
            },
        ];
        let message = MessageV0::try_compile(&payer, &instructions, &[], Hash::default()).unwrap();
        let decompiled =
            decompile_instructions(&VersionedMessage::V0(message), &LoadedAddresses::default())
                .unwrap();
        assert_eq!(decompiled, instructions);
    }

    #[test]
    fn test_round_trips_legacy_message() {
        let payer = key(1);
        let instructions = vec![Instruction {
            program_id: key(21),
            accounts: vec![
                AccountMeta::new(payer, true),
                AccountMeta::new(key(2), false),
                AccountMeta::new_readonly(key(3), false),
            ],
            data: vec![9],
        }];
        let message = Message::new(&instructions, Some(&payer));
        let decompiled =
            decompile_instructions(&VersionedMessage::Legacy(message), &LoadedAddresses::default())
                .unwrap();
        assert_eq!(decompiled, instructions);
    }

    #[test]
    fn test_resolves_lookup_table_addresses() {
        let message = MessageV0 {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec![key(1), key(21)],
            recent_blockhash: Hash::default(),
            instructions: vec![CompiledInstruction::new_from_raw_parts(1, vec![], vec![0, 2, 3])],
            address_table_lookups: vec![],
        };
        let loaded = LoadedAddresses {
            writable: vec![key(5)],
            readonly: vec![key(6)],
        };
        let message = VersionedMessage::V0(message);
        assert_eq!(account_keys(&message, &loaded), vec![key(1), key(21), key(5), key(6)]);
        let decompiled = decompile_instructions(&message, &loaded).unwrap();
        assert_eq!(
            decompiled[0].accounts,
            vec![
                AccountMeta::new(key(1), true),
                AccountMeta::new(key(5), false),
                AccountMeta::new_readonly(key(6), false),
            ]
        );
    }

    #[test]
    fn test_rejects_out_of_range_indices() {
        let message = |program_id_index: u8, accounts: Vec<u8>| {
            VersionedMessage::Legacy(Message {
                header: MessageHeader {
                    num_required_signatures: 1,
                    num_readonly_signed_accounts: 0,
                    num_readonly_unsigned_accounts: 1,
                },
                account_keys: vec![key(1), key(21)],
                recent_blockhash: Hash::default(),
                instructions: vec![CompiledInstruction::new_from_raw_parts(
                    program_id_index,
                    vec![],
                    accounts,
                )],
            })
        };
        let loaded = LoadedAddresses::default();
        assert_eq!(
            decompile_instructions(&message(1, vec![0, 7]), &loaded),
            Err(MessageError::InvalidAccountIndex(7))
        );
        assert_eq!(
            decompile_instructions(&message(5, vec![0]), &loaded),
            Err(MessageError::InvalidProgramIdIndex(5))
        );
    }
}
