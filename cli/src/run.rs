//! `solana-pay` command-line entrypoint.
//!
//! Subcommands:
//! - `url encode` / `url parse` - Convert between flags and `solana:` URLs
//! - `transfer` - Build the unsigned transfer a wallet would sign for a URL
//! - `broadcast` - Submit a wallet-signed transaction
//! - `validate` - Wait until a signature settles and pays the URL's request
//! - `find-reference` - Wait for the first transaction mentioning a reference
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `CONFIG` points at the JSON config file
//! - `SOLANA_RPC_URL` is the default RPC endpoint
//! - `RUST_LOG` controls log verbosity

use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use serde_json::json;
use solana_pay::chain::{Address, LedgerLike, SolanaChainProvider};
use solana_pay::poll::{wait_for_reference, wait_for_transfer};
use solana_pay::request::PaymentRequest;
use solana_pay::transfer::create_transfer;
use solana_pay::url::{PaymentUrl, TransactionRequestUrl, TransferRequestUrl};
use solana_pay_types::amount::Amount;
use solana_pay_types::util::Base64Bytes;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::error::Error;
use url::Url;

use crate::config::{CliArgs, Config};
use crate::sig_down::cancel_on_signal;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode or decode `solana:` payment URLs
    #[command(subcommand)]
    Url(UrlCommand),
    /// Build the unsigned transfer transaction for a transfer request URL
    Transfer {
        /// Wallet that pays and signs
        #[arg(long)]
        payer: Address,
        /// `solana:` transfer request URL
        url: String,
    },
    /// Submit a signed, base64-encoded transaction
    Broadcast {
        transaction: String,
    },
    /// Wait until a transaction settles and pays the request in a URL
    Validate {
        #[arg(long)]
        signature: Signature,
        /// `solana:` transfer request URL
        url: String,
    },
    /// Wait for the oldest transaction that mentions a reference account
    FindReference {
        reference: Address,
    },
}

#[derive(Subcommand, Debug)]
pub enum UrlCommand {
    /// Build a `solana:` URL from flags
    Encode(EncodeArgs),
    /// Print a `solana:` URL as JSON
    Parse { url: String },
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Wallet that receives the payment (transfer request)
    #[arg(long, required_unless_present = "link", conflicts_with = "link")]
    recipient: Option<Address>,
    #[arg(long)]
    amount: Option<Amount>,
    /// Token mint, native SOL when absent
    #[arg(long)]
    spl_token: Option<Address>,
    /// Reference account, repeatable, order is kept
    #[arg(long = "reference")]
    references: Vec<Address>,
    #[arg(long)]
    memo: Option<String>,
    /// HTTPS endpoint serving the transaction (transaction request)
    #[arg(long, conflicts_with_all = ["amount", "spl_token", "references", "memo"])]
    link: Option<Url>,
    #[arg(long)]
    label: Option<String>,
    #[arg(long)]
    message: Option<String>,
}

impl EncodeArgs {
    fn into_payment_url(self) -> Result<PaymentUrl, RunError> {
        if let Some(link) = self.link {
            if link.scheme() != "https" {
                return Err(RunError::LinkNotHttps);
            }
            return Ok(PaymentUrl::Transaction(TransactionRequestUrl {
                link,
                label: self.label,
                message: self.message,
            }));
        }
        let recipient = self.recipient.ok_or(RunError::RecipientMissing)?;
        Ok(PaymentUrl::Transfer(TransferRequestUrl {
            recipient,
            amount: self.amount,
            spl_token: self.spl_token,
            references: self.references,
            label: self.label,
            message: self.message,
            memo: self.memo,
        }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Expected a transfer request URL, got a transaction request")]
    NotATransferRequest,
    #[error("Either --recipient or --link is required")]
    RecipientMissing,
    #[error("Transaction request links must use https")]
    LinkNotHttps,
}

/// Parses a `solana:` URL that must be a transfer request with an amount.
fn transfer_request(url: &str) -> Result<PaymentRequest, Box<dyn Error>> {
    match PaymentUrl::parse(url)? {
        PaymentUrl::Transfer(transfer) => Ok(transfer.into_payment_request()?),
        PaymentUrl::Transaction(_) => Err(RunError::NotATransferRequest.into()),
    }
}

/// Runs the `solana-pay` tool.
///
/// - Loads `.env` variables.
/// - Initializes logging.
/// - Loads the JSON config.
/// - Dispatches the subcommand, printing its result to stdout.
pub async fn run() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let args = CliArgs::parse();

    #[cfg(feature = "telemetry")]
    crate::telemetry::init();

    let config = Config::load(&args.config)?;

    match args.command {
        Command::Url(UrlCommand::Encode(encode)) => {
            println!("{}", encode.into_payment_url()?);
        }
        Command::Url(UrlCommand::Parse { url }) => {
            let parsed = PaymentUrl::parse(&url)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::Transfer { payer, url } => {
            let request = transfer_request(&url)?;
            let provider = SolanaChainProvider::from_config(config.chain());
            let tx = create_transfer(&provider, payer.pubkey(), &request).await?;
            let fee = provider.get_fee_for_message(&tx.message()?).await?;
            let output = json!({
                "transaction": tx.to_base64()?.to_string(),
                "fee": fee,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Broadcast { transaction } => {
            let bytes = Base64Bytes::from(transaction).decode()?;
            let transaction: VersionedTransaction = bincode::deserialize(&bytes)?;
            let provider = SolanaChainProvider::from_config(config.chain());
            let signature = provider.send_transaction(&transaction).await?;
            println!("{signature}");
        }
        Command::Validate { signature, url } => {
            let request = transfer_request(&url)?;
            let provider = SolanaChainProvider::from_config(config.chain());
            let cancel = cancel_on_signal()?;
            let poller = config.poll().poller();
            let settled =
                wait_for_transfer(&provider, &signature, &request, &poller, &cancel).await?;
            let output = json!({
                "signature": signature.to_string(),
                "slot": settled.slot,
                "blockTime": settled.block_time,
                "fee": settled.meta.as_ref().map(|meta| meta.fee),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::FindReference { reference } => {
            let provider = SolanaChainProvider::from_config(config.chain());
            let cancel = cancel_on_signal()?;
            let poller = config.poll().poller();
            let signature =
                wait_for_reference(&provider, reference.pubkey(), &poller, &cancel).await?;
            println!("{signature}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "mvines9iiHiQTysrwkJjGf2gb9Ex9jXJX8ns3qwf2kN";

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("solana-pay").chain(args.iter().copied()))
    }

    #[test]
    fn test_encode_transfer_url() {
        let args = parse(&[
            "url", "encode", "--recipient", RECIPIENT, "--amount", "0.01", "--memo", "OrderId1234",
        ])
        .unwrap();
        let Command::Url(UrlCommand::Encode(encode)) = args.command else {
            panic!("expected url encode");
        };
        let url = encode.into_payment_url().unwrap();
        assert_eq!(
            url.to_string(),
            format!("solana:{RECIPIENT}?amount=0.01&memo=OrderId1234")
        );
    }

    #[test]
    fn test_encode_requires_recipient_or_link() {
        assert!(parse(&["url", "encode", "--amount", "1"]).is_err());
        let both = ["url", "encode", "--recipient", RECIPIENT, "--link", "https://a.b/"];
        assert!(parse(&both).is_err());
    }

    #[test]
    fn test_encode_rejects_plain_http_link() {
        let args = parse(&["url", "encode", "--link", "http://example.com/pay"]).unwrap();
        let Command::Url(UrlCommand::Encode(encode)) = args.command else {
            panic!("expected url encode");
        };
        assert!(matches!(encode.into_payment_url(), Err(RunError::LinkNotHttps)));
    }

    #[test]
    fn test_transfer_request_rejects_transaction_url() {
        let err = transfer_request("solana:https%3A%2F%2Fexample.com%2Fpay").unwrap_err();
        assert_eq!(err.to_string(), RunError::NotATransferRequest.to_string());
    }

    #[test]
    fn test_transfer_request_requires_amount() {
        let err = transfer_request(&format!("solana:{RECIPIENT}")).unwrap_err();
        assert_eq!(err.to_string(), "amount missing");
    }

    #[test]
    fn test_validate_args() {
        let signature = Signature::from([1u8; 64]).to_string();
        let url = format!("solana:{RECIPIENT}?amount=1");
        let args = parse(&["validate", "--signature", &signature, &url]).unwrap();
        assert!(matches!(args.command, Command::Validate { .. }));
    }
}
