//! The `solana:` payment URL.
//!
//! Two shapes share the scheme:
//!
//! - **transfer request**: `solana:<recipient>?amount=&spl-token=&reference=&label=&message=&memo=`
//!   carries everything needed to build the transfer locally;
//! - **transaction request**: `solana:<percent-encoded https link>?label=&message=`
//!   points the wallet at a server that returns the transaction to sign.
//!
//! A pathname containing `:` or `%` can never be a base58 address, so it is
//! read as a link.
//!
//! # Example
//!
//! ```
//! use solana_pay::url::PaymentUrl;
//!
//! let url = PaymentUrl::parse(
//!     "solana:mvines9iiHiQTysrwkJjGf2gb9Ex9jXJX8ns3qwf2kN?amount=0.01&label=Michael",
//! )
//! .unwrap();
//! let PaymentUrl::Transfer(transfer) = url else { panic!() };
//! assert_eq!(transfer.amount.unwrap().to_string(), "0.01");
//! ```

use serde::{Deserialize, Serialize};
use solana_pay_types::amount::Amount;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;
use url::form_urlencoded;

use crate::chain::Address;
use crate::request::PaymentRequest;

pub const SOLANA_PROTOCOL: &str = "solana";

/// URLs longer than this do not fit a QR code reliably and are rejected.
pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseUrlError {
    #[error("length invalid")]
    LengthInvalid,
    #[error("url invalid")]
    UrlInvalid,
    #[error("protocol invalid")]
    ProtocolInvalid,
    #[error("pathname missing")]
    PathnameMissing,
    #[error("recipient invalid")]
    RecipientInvalid,
    #[error("amount invalid")]
    AmountInvalid,
    #[error("spl-token invalid")]
    SplTokenInvalid,
    #[error("reference invalid")]
    ReferenceInvalid,
    #[error("link invalid")]
    LinkInvalid,
    /// A transfer URL without an amount leaves the amount to the payer and
    /// cannot be turned into a [`PaymentRequest`] as is.
    #[error("amount missing")]
    AmountMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequestUrl {
    pub recipient: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spl_token: Option<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequestUrl {
    pub link: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PaymentUrl {
    Transfer(TransferRequestUrl),
    Transaction(TransactionRequestUrl),
}

impl PaymentUrl {
    pub fn parse(input: &str) -> Result<Self, ParseUrlError> {
        if input.len() > MAX_URL_LENGTH {
            return Err(ParseUrlError::LengthInvalid);
        }
        let url = Url::parse(input).map_err(|_| ParseUrlError::UrlInvalid)?;
        if url.scheme() != SOLANA_PROTOCOL {
            return Err(ParseUrlError::ProtocolInvalid);
        }
        let pathname = url.path();
        if pathname.is_empty() {
            return Err(ParseUrlError::PathnameMissing);
        }
        if pathname.contains([':', '%']) {
            parse_transaction_request(&url, pathname).map(PaymentUrl::Transaction)
        } else {
            parse_transfer_request(&url, pathname).map(PaymentUrl::Transfer)
        }
    }

    /// Serializes back into a `solana:` URL string.
    pub fn encode(&self) -> String {
        match self {
            PaymentUrl::Transfer(transfer) => transfer.encode(),
            PaymentUrl::Transaction(transaction) => transaction.encode(),
        }
    }
}

impl FromStr for PaymentUrl {
    type Err = ParseUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentUrl::parse(s)
    }
}

impl Display for PaymentUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl TransferRequestUrl {
    pub fn encode(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(amount) = &self.amount {
            query.append_pair("amount", &amount.to_string());
        }
        if let Some(spl_token) = &self.spl_token {
            query.append_pair("spl-token", &spl_token.to_string());
        }
        for reference in &self.references {
            query.append_pair("reference", &reference.to_string());
        }
        append_display_params(&mut query, &self.label, &self.message);
        if let Some(memo) = &self.memo {
            query.append_pair("memo", memo);
        }
        with_query(format!("{SOLANA_PROTOCOL}:{}", self.recipient), query.finish())
    }

    /// Converts into a [`PaymentRequest`]. Fails when the URL has no amount.
    pub fn into_payment_request(self) -> Result<PaymentRequest, ParseUrlError> {
        let amount = self.amount.ok_or(ParseUrlError::AmountMissing)?;
        Ok(PaymentRequest {
            recipient: self.recipient,
            amount,
            spl_token: self.spl_token,
            references: self.references,
            memo: self.memo,
            label: self.label,
            message: self.message,
        })
    }
}

impl From<&PaymentRequest> for TransferRequestUrl {
    fn from(request: &PaymentRequest) -> Self {
        Self {
            recipient: request.recipient,
            amount: Some(request.amount),
            spl_token: request.spl_token,
            references: request.references.clone(),
            label: request.label.clone(),
            message: request.message.clone(),
            memo: request.memo.clone(),
        }
    }
}

impl TryFrom<TransferRequestUrl> for PaymentRequest {
    type Error = ParseUrlError;

    fn try_from(value: TransferRequestUrl) -> Result<Self, Self::Error> {
        value.into_payment_request()
    }
}

impl TransactionRequestUrl {
    pub fn encode(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        append_display_params(&mut query, &self.label, &self.message);
        let link = urlencoding::encode(self.link.as_str());
        with_query(format!("{SOLANA_PROTOCOL}:{link}"), query.finish())
    }
}

fn parse_transfer_request(url: &Url, pathname: &str) -> Result<TransferRequestUrl, ParseUrlError> {
    let recipient = Address::from_str(pathname).map_err(|_| ParseUrlError::RecipientInvalid)?;
    let amount = first_param(url, "amount")
        .map(|amount| Amount::parse(&amount).map_err(|_| ParseUrlError::AmountInvalid))
        .transpose()?;
    let spl_token = first_param(url, "spl-token")
        .map(|mint| Address::from_str(&mint).map_err(|_| ParseUrlError::SplTokenInvalid))
        .transpose()?;
    let references = url
        .query_pairs()
        .filter(|(key, _)| key == "reference")
        .map(|(_, value)| Address::from_str(&value).map_err(|_| ParseUrlError::ReferenceInvalid))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TransferRequestUrl {
        recipient,
        amount,
        spl_token,
        references,
        label: first_param(url, "label"),
        message: first_param(url, "message"),
        memo: first_param(url, "memo"),
    })
}

fn parse_transaction_request(
    url: &Url,
    pathname: &str,
) -> Result<TransactionRequestUrl, ParseUrlError> {
    let decoded = urlencoding::decode(pathname).map_err(|_| ParseUrlError::LinkInvalid)?;
    let link = Url::parse(&decoded).map_err(|_| ParseUrlError::LinkInvalid)?;
    if link.scheme() != "https" {
        return Err(ParseUrlError::LinkInvalid);
    }
    Ok(TransactionRequestUrl {
        link,
        label: first_param(url, "label"),
        message: first_param(url, "message"),
    })
}

fn first_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn append_display_params(
    query: &mut form_urlencoded::Serializer<'_, String>,
    label: &Option<String>,
    message: &Option<String>,
) {
    if let Some(label) = label {
        query.append_pair("label", label);
    }
    if let Some(message) = message {
        query.append_pair("message", message);
    }
}

fn with_query(base: String, query: String) -> String {
    if query.is_empty() {
        base
    } else {
        format!("{base}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "mvines9iiHiQTysrwkJjGf2gb9Ex9jXJX8ns3qwf2kN";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const REFERENCE: &str = "82ZJ7nbGpixjeDCmEhUcmwXYfvurzAgGdtSMuHnUgyny";

    fn transfer(url: &str) -> TransferRequestUrl {
        match PaymentUrl::parse(url).unwrap() {
            PaymentUrl::Transfer(transfer) => transfer,
            other => panic!("expected transfer request, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_full_transfer_request() {
        let url = format!(
            "solana:{RECIPIENT}?amount=0.01&spl-token={USDC}&reference={REFERENCE}&label=Michael&message=Thanks%20for%20all%20the%20fish&memo=OrderId5678"
        );
        let parsed = transfer(&url);
        assert_eq!(parsed.recipient.to_string(), RECIPIENT);
        assert_eq!(parsed.amount, Some("0.01".parse().unwrap()));
        assert_eq!(parsed.spl_token.unwrap().to_string(), USDC);
        assert_eq!(parsed.references.len(), 1);
        assert_eq!(parsed.label.as_deref(), Some("Michael"));
        assert_eq!(parsed.message.as_deref(), Some("Thanks for all the fish"));
        assert_eq!(parsed.memo.as_deref(), Some("OrderId5678"));
    }

    #[test]
    fn test_parse_without_amount() {
        let parsed = transfer(&format!("solana:{RECIPIENT}?label=Michael"));
        assert_eq!(parsed.amount, None);
        assert_eq!(
            parsed.into_payment_request().unwrap_err(),
            ParseUrlError::AmountMissing
        );
    }

    #[test]
    fn test_parse_multiple_references_in_order() {
        let second = "11111111111111111111111111111112";
        let parsed = transfer(&format!(
            "solana:{RECIPIENT}?amount=1&reference={REFERENCE}&reference={second}"
        ));
        let references: Vec<String> = parsed.references.iter().map(|r| r.to_string()).collect();
        assert_eq!(references, vec![REFERENCE.to_string(), second.to_string()]);
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("bitcoin:abc".to_string(), ParseUrlError::ProtocolInvalid),
            ("solana:".to_string(), ParseUrlError::PathnameMissing),
            ("solana:not-an-address".to_string(), ParseUrlError::RecipientInvalid),
            (format!("solana:{RECIPIENT}?amount=1e3"), ParseUrlError::AmountInvalid),
            (format!("solana:{RECIPIENT}?amount=-1"), ParseUrlError::AmountInvalid),
            (format!("solana:{RECIPIENT}?spl-token=xyz"), ParseUrlError::SplTokenInvalid),
            (format!("solana:{RECIPIENT}?reference=xyz"), ParseUrlError::ReferenceInvalid),
            ("solana:http%3A%2F%2Fexample.com".to_string(), ParseUrlError::LinkInvalid),
            ("not a url".to_string(), ParseUrlError::UrlInvalid),
        ];
        for (url, expected) in cases {
            assert_eq!(PaymentUrl::parse(&url).unwrap_err(), expected, "{url}");
        }
    }

    #[test]
    fn test_parse_rejects_oversized_url() {
        let url = format!("solana:{RECIPIENT}?memo={}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(PaymentUrl::parse(&url).unwrap_err(), ParseUrlError::LengthInvalid);
    }

    #[test]
    fn test_parse_transaction_request() {
        let url = "solana:https%3A%2F%2Fexample.com%2Fsolana-pay%3Forder%3D12345?label=Shop";
        let PaymentUrl::Transaction(parsed) = PaymentUrl::parse(url).unwrap() else {
            panic!("expected transaction request");
        };
        assert_eq!(parsed.link.as_str(), "https://example.com/solana-pay?order=12345");
        assert_eq!(parsed.label.as_deref(), Some("Shop"));
        assert_eq!(parsed.message, None);
    }

    #[test]
    fn test_encode_transfer_request_field_order() {
        let request = PaymentRequest::new(RECIPIENT.parse().unwrap(), "1.50".parse().unwrap())
            .with_spl_token(USDC.parse().unwrap())
            .with_reference(REFERENCE.parse().unwrap())
            .with_label("Michael")
            .with_message("Thanks for all the fish")
            .with_memo("OrderId1234");
        let encoded = TransferRequestUrl::from(&request).encode();
        assert_eq!(
            encoded,
            format!(
                "solana:{RECIPIENT}?amount=1.5&spl-token={USDC}&reference={REFERENCE}&label=Michael&message=Thanks+for+all+the+fish&memo=OrderId1234"
            )
        );
        let parsed = transfer(&encoded).into_payment_request().unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_encode_bare_recipient() {
        let url = PaymentUrl::Transfer(TransferRequestUrl {
            recipient: RECIPIENT.parse().unwrap(),
            amount: None,
            spl_token: None,
            references: vec![],
            label: None,
            message: None,
            memo: None,
        });
        assert_eq!(url.to_string(), format!("solana:{RECIPIENT}"));
    }

    #[test]
    fn test_encode_transaction_request() {
        let url = PaymentUrl::Transaction(TransactionRequestUrl {
            link: Url::parse("https://example.com/solana-pay").unwrap(),
            label: Some("Shop".to_string()),
            message: None,
        });
        let encoded = url.encode();
        assert_eq!(
            encoded,
            "solana:https%3A%2F%2Fexample.com%2Fsolana-pay?label=Shop"
        );
        assert_eq!(PaymentUrl::parse(&encoded).unwrap(), url);
    }
}
