use serde::{Deserialize, Serialize};
use solana_pay_types::amount::Amount;

use crate::chain::Address;

/// What the payee asks for: who gets paid, how much, in which asset, and the
/// markers that make the payment findable and attributable afterwards.
///
/// The same value drives both sides of a payment: the payer builds a
/// transaction from it with [`crate::transfer::create_transfer`], and the payee
/// checks the settled transaction against it with
/// [`crate::transfer::validate_transfer`].
///
/// # Example
///
/// ```
/// use solana_pay::chain::Address;
/// use solana_pay::request::PaymentRequest;
///
/// let recipient: Address = "mvines9iiHiQTysrwkJjGf2gb9Ex9jXJX8ns3qwf2kN".parse().unwrap();
/// let request = PaymentRequest::new(recipient, "0.5".parse().unwrap())
///     .with_memo("order-42");
/// assert!(request.spl_token.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Wallet that receives the funds. For token payments this is the owner of
    /// the receiving associated token account, not the token account itself.
    pub recipient: Address,
    /// Amount in display units of the asset.
    pub amount: Amount,
    /// Mint of the token to transfer. `None` means native SOL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spl_token: Option<Address>,
    /// Read-only, non-signing accounts attached to the transfer instruction,
    /// in order. Duplicates are kept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaymentRequest {
    pub fn new(recipient: Address, amount: Amount) -> Self {
        Self {
            recipient,
            amount,
            spl_token: None,
            references: Vec::new(),
            memo: None,
            label: None,
            message: None,
        }
    }

    pub fn with_spl_token(mut self, mint: Address) -> Self {
        self.spl_token = Some(mint);
        self
    }

    pub fn with_reference(mut self, reference: Address) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_references<I: IntoIterator<Item = Address>>(mut self, references: I) -> Self {
        self.references.extend(references);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
