use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::payments::chain::{ChainError, ChainProvider};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transaction not found")]
    NotFound,

    #[error("transaction recipient does not match")]
    WrongRecipient,

    #[error("transaction sender does not match")]
    WrongSender,

    #[error("transaction amount does not match")]
    WrongAmount,

    #[error("transaction reverted")]
    Reverted,

    #[error("transaction not mined after {0} receipt checks")]
    Unconfirmed(u32),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// A transfer that exists, pays the expected recipient the expected amount,
/// and was mined successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTransfer {
    pub transaction_hash: String,
    pub sender: String,
    pub recipient: String,
    pub value_wei: u128,
    pub block_number: u64,
    pub gas_used: u128,
}

/// How long to wait for a receipt.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolling {
    pub attempts: u32,
    pub interval: Duration,
}

/// What a transfer must look like to be accepted.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedTransfer<'a> {
    pub recipient: &'a str,
    pub value_wei: u128,
    /// `None` accepts any sender.
    pub sender: Option<&'a str>,
}

/// Checks `hash` against `expected`, then polls for its receipt. Addresses
/// compare case-insensitively.
pub async fn verify_transfer(
    provider: &dyn ChainProvider,
    hash: &str,
    expected: ExpectedTransfer<'_>,
    polling: ReceiptPolling,
) -> Result<VerifiedTransfer, TransferError> {
    let tx = provider
        .transaction(hash)
        .await?
        .ok_or(TransferError::NotFound)?;

    let recipient = tx.to.unwrap_or_default();
    if !recipient.eq_ignore_ascii_case(expected.recipient) {
        return Err(TransferError::WrongRecipient);
    }
    if let Some(sender) = expected.sender {
        if !tx.from.eq_ignore_ascii_case(sender) {
            return Err(TransferError::WrongSender);
        }
    }
    if tx.value_wei != expected.value_wei {
        return Err(TransferError::WrongAmount);
    }

    let attempts = polling.attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(receipt) = provider.receipt(hash).await? {
            if !receipt.status {
                return Err(TransferError::Reverted);
            }
            info!(hash, block = receipt.block_number, "Transfer confirmed");
            return Ok(VerifiedTransfer {
                transaction_hash: tx.hash,
                sender: tx.from.to_lowercase(),
                recipient: recipient.to_lowercase(),
                value_wei: tx.value_wei,
                block_number: receipt.block_number,
                gas_used: receipt.gas_used,
            });
        }
        if attempt < attempts {
            debug!(hash, attempt, "Receipt not available yet");
            tokio::time::sleep(polling.interval).await;
        }
    }
    Err(TransferError::Unconfirmed(attempts))
}
