//! Building and validating transfer-request transactions.
//!
//! [`create_transfer`] runs on the payer side and produces the unsigned
//! `[memo?, transfer]` transaction. [`validate_transfer`] runs on the payee side
//! once the wallet has broadcast it, and proves from the settled record that
//! the payment matches the request.

pub mod builder;
pub mod message;
pub mod types;
pub mod validator;

pub use builder::create_transfer;
pub use types::*;
pub use validator::{validate_transfer, verify_settled_transfer};
