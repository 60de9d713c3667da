//! Caller-side polling.
//!
//! Validation and reference lookup answer from the ledger's current state and
//! never retry on their own. A freshly broadcast transaction is usually not
//! indexed yet, so callers repeat the check at a fixed interval while it fails
//! with a retryable error, until it succeeds, fails for good, runs out of
//! attempts or is cancelled.
//!
//! Cancellation is observed between attempts. A ledger call already in flight
//! is allowed to finish.
//!
//! # Example
//!
//! ```ignore
//! use solana_pay::poll::{Poller, wait_for_transfer};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let proof = wait_for_transfer(&provider, &signature, &request, &Poller::default(), &cancel).await?;
//! ```

use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::chain::ledger::{LedgerLike, SettledTransaction};
use crate::reference::{FindReferenceError, find_reference};
use crate::request::PaymentRequest;
use crate::transfer::{ValidateTransferError, validate_transfer};

/// Errors that may go away by asking again later.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ValidateTransferError {
    fn is_retryable(&self) -> bool {
        ValidateTransferError::is_retryable(self)
    }
}

impl Retryable for FindReferenceError {
    fn is_retryable(&self) -> bool {
        FindReferenceError::is_retryable(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    #[error("polling cancelled")]
    Cancelled,
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error(transparent)]
    Failed(E),
}

/// Fixed-interval retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            max_attempts: None,
        }
    }
}

impl Poller {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Gives up after `max_attempts` calls (at least one is always made).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Calls `operation` until it succeeds or fails with a non-retryable error.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, PollError<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            attempts += 1;
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => return Err(PollError::Failed(error)),
                Err(error) => error,
            };
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(PollError::Exhausted {
                    attempts,
                    last: error,
                });
            }

            #[cfg(feature = "telemetry")]
            tracing::trace!(attempts, error = %error, "Not ready, retrying");

            tokio::select! {
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

/// Polls [`validate_transfer`] until the transfer behind `signature` is settled and valid.
pub async fn wait_for_transfer<L: LedgerLike>(
    ledger: &L,
    signature: &Signature,
    request: &PaymentRequest,
    poller: &Poller,
    cancel: &CancellationToken,
) -> Result<SettledTransaction, PollError<ValidateTransferError>> {
    poller
        .run(cancel, || validate_transfer(ledger, signature, request))
        .await
}

/// Polls [`find_reference`] until a transaction mentioning `reference` shows up.
pub async fn wait_for_reference<L: LedgerLike>(
    ledger: &L,
    reference: &Pubkey,
    poller: &Poller,
    cancel: &CancellationToken,
) -> Result<Signature, PollError<FindReferenceError>> {
    poller.run(cancel, || find_reference(ledger, reference)).await
}
