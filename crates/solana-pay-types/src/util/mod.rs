//! Utility helpers.
//!
//! - [`b64`] - Base64 encoding of serialized transactions

pub mod b64;

pub use b64::*;
