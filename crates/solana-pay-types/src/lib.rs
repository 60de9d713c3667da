#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Chain-agnostic types for Solana Pay transfer requests.
//!
//! This crate holds the pieces of the transfer request protocol that do not
//! depend on a ledger client: decimal amounts as entered by a payer,
//! configuration values that may be resolved from the environment, and
//! encoding helpers used when handing transactions to wallets.
//!
//! # Modules
//!
//! - [`amount`] - Decimal amounts with precision checks and base-unit conversion
//! - [`config`] - Configuration values resolved from literals or environment variables
//! - [`util`] - Base64 helpers

pub mod amount;
pub mod config;
pub mod util;
