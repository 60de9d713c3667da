//! Solana chain support: addresses, ledger access and SPL token state.

pub mod config;
pub mod ledger;
pub mod provider;
pub mod token;
pub mod types;

pub use config::*;
pub use ledger::*;
pub use provider::*;
pub use token::*;
pub use types::*;
