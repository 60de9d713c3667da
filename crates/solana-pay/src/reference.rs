//! Locating a payment by one of its reference accounts.

use solana_pubkey::Pubkey;
use solana_signature::Signature;

use crate::chain::ledger::{LedgerError, LedgerLike};

/// Page size of signature searches.
pub const SIGNATURES_PAGE_LIMIT: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum FindReferenceError {
    /// No transaction mentions the reference yet.
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl FindReferenceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FindReferenceError::NotFound)
    }
}

/// Returns the oldest transaction signature that mentions `reference`.
///
/// The ledger lists signatures newest first; full pages are followed backwards
/// until a short one is reached.
pub async fn find_reference<L: LedgerLike>(
    ledger: &L,
    reference: &Pubkey,
) -> Result<Signature, FindReferenceError> {
    let mut before = None;
    let mut oldest = None;
    loop {
        let page = ledger
            .get_signatures_for_address(reference, before, SIGNATURES_PAGE_LIMIT)
            .await?;
        let Some(last) = page.last().copied() else {
            break;
        };
        oldest = Some(last);
        if page.len() < SIGNATURES_PAGE_LIMIT {
            break;
        }
        before = Some(last);
    }

    #[cfg(feature = "telemetry")]
    if let Some(signature) = &oldest {
        tracing::debug!(%reference, %signature, "Found reference");
    }

    oldest.ok_or(FindReferenceError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryLedger, key};

    fn signature(n: u16) -> Signature {
        let mut bytes = [0u8; 64];
        bytes[..2].copy_from_slice(&n.to_le_bytes());
        Signature::from(bytes)
    }

    #[tokio::test]
    async fn test_not_found() {
        let ledger = MemoryLedger::default();
        let err = find_reference(&ledger, &key(7)).await.unwrap_err();
        assert!(matches!(err, FindReferenceError::NotFound));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_returns_oldest_signature() {
        let ledger = MemoryLedger::default();
        for n in 1..=3 {
            ledger.push_signature(key(7), signature(n));
        }
        ledger.push_signature(key(8), signature(99));
        assert_eq!(find_reference(&ledger, &key(7)).await.unwrap(), signature(1));
    }

    #[tokio::test]
    async fn test_follows_full_pages() {
        let ledger = MemoryLedger::default();
        let total = SIGNATURES_PAGE_LIMIT as u16 * 2 + 5;
        for n in 1..=total {
            ledger.push_signature(key(7), signature(n));
        }
        assert_eq!(find_reference(&ledger, &key(7)).await.unwrap(), signature(1));
    }

    #[tokio::test]
    async fn test_exactly_one_full_page() {
        let ledger = MemoryLedger::default();
        for n in 1..=SIGNATURES_PAGE_LIMIT as u16 {
            ledger.push_signature(key(7), signature(n));
        }
        assert_eq!(find_reference(&ledger, &key(7)).await.unwrap(), signature(1));
    }
}
