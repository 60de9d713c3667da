#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana Pay transfer requests.
//!
//! A transfer request asks a wallet to move native SOL or an SPL token to a
//! recipient, optionally tagging the transaction with reference accounts (so
//! the payee can find it on-chain) and a memo. This crate covers both ends of
//! that exchange:
//!
//! - **Payer side**: [`create_transfer`] checks the request against the
//!   ledger (account ownership, token account state, precision, balance) and
//!   builds the unsigned `[memo?, transfer]` transaction.
//! - **Payee side**: [`validate_transfer`] fetches the settled transaction,
//!   reconstructs its instructions from the compiled message and proves it
//!   pays the request: same recipient, at least the amount, same token,
//!   references in order, same memo.
//!
//! # Architecture
//!
//! - [`chain`] - Addresses, the [`chain::LedgerLike`] capability trait, the
//!   RPC-backed [`chain::SolanaChainProvider`] and SPL token state
//! - [`request`] - [`PaymentRequest`]
//! - [`url`] - The `solana:` payment URL codec
//! - [`transfer`] - Builder, validator and message reconstruction
//! - [`reference`] - Finding a payment by reference account
//! - [`poll`] - Caller-side retry loop with cancellation
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` events for builder, validator, poller and provider
//!
//! # Usage Examples
//!
//! ## Payer: Building the Transfer
//!
//! ```ignore
//! use solana_pay::chain::{SolanaChainConfig, SolanaChainProvider};
//! use solana_pay::url::PaymentUrl;
//! use solana_pay::create_transfer;
//!
//! let provider = SolanaChainProvider::from_config(&SolanaChainConfig::default());
//! let PaymentUrl::Transfer(url) = PaymentUrl::parse(link)? else { unreachable!() };
//! let request = url.into_payment_request()?;
//! let tx = create_transfer(&provider, &payer, &request).await?;
//! let unsigned = tx.to_base64()?;
//! ```
//!
//! ## Payee: Waiting for the Payment
//!
//! ```ignore
//! use solana_pay::poll::{Poller, wait_for_reference, wait_for_transfer};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let signature = wait_for_reference(&provider, &reference, &Poller::default(), &cancel).await?;
//! let proof = wait_for_transfer(&provider, &signature, &request, &Poller::default(), &cancel).await?;
//! ```

pub mod chain;
pub mod poll;
pub mod reference;
pub mod request;
pub mod transfer;
pub mod url;

#[cfg(test)]
mod testing;

pub use request::PaymentRequest;
pub use transfer::{create_transfer, validate_transfer};
