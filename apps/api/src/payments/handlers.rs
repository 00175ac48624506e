use std::time::Duration;

use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::jobs::{queries as job_queries, rules::ensure_owner};
use crate::models::payment::{PaymentKind, PaymentRow, PaymentStatus};
use crate::pagination::{PageParams, Pagination};
use crate::payments::queries::{self, NewPayment, PLATFORM_FEE_TX_CONSTRAINT};
use crate::payments::units::{format_ether, parse_wei};
use crate::models::user::UserRow;
use crate::payments::verify::{
    verify_transfer, ExpectedTransfer, ReceiptPolling, TransferError, VerifiedTransfer,
};
use crate::state::AppState;
use crate::validation::{is_eth_address, is_tx_hash, AppJson, AppQuery, FieldErrors};

const INVALID_HASH: &str = "Invalid transaction hash";

fn polling(state: &AppState) -> ReceiptPolling {
    ReceiptPolling {
        attempts: state.config.receipt_poll_attempts,
        interval: Duration::from_millis(state.config.receipt_poll_interval_ms),
    }
}

/// Wei amounts arrive either as JSON integers or decimal strings.
fn wei_from_json(value: &Option<Value>) -> Option<u128> {
    match value.as_ref()? {
        Value::String(s) => parse_wei(s),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}

/// User-facing wording for each way a transfer can fail.
struct TransferMessages {
    wrong_recipient: &'static str,
    wrong_sender: &'static str,
    wrong_amount: &'static str,
    reverted: &'static str,
}

const VERIFY_MESSAGES: TransferMessages = TransferMessages {
    wrong_recipient: "Transaction recipient does not match",
    wrong_sender: "Transaction sender does not match",
    wrong_amount: "Transaction amount does not match",
    reverted: "Transaction failed",
};

const PLATFORM_FEE_MESSAGES: TransferMessages = TransferMessages {
    wrong_recipient: "Incorrect recipient for platform fee",
    wrong_sender: "Platform fee was not paid from your connected wallet",
    wrong_amount: "Incorrect platform fee amount",
    reverted: "Platform fee payment failed",
};

fn transfer_error(err: TransferError, messages: &TransferMessages) -> AppError {
    let message = match err {
        TransferError::Chain(e) => return AppError::Chain(e),
        TransferError::NotFound => "Transaction not found",
        TransferError::WrongRecipient => messages.wrong_recipient,
        TransferError::WrongSender => messages.wrong_sender,
        TransferError::WrongAmount => messages.wrong_amount,
        TransferError::Reverted => messages.reverted,
        TransferError::Unconfirmed(_) => "Transaction is not confirmed yet",
    };
    AppError::BadRequest(message.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Verification and platform fee
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyRequest {
    pub transaction_hash: String,
    pub amount: Option<Value>,
    pub to: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub message: &'static str,
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: String,
}

/// POST /api/payments/verify
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    let hash = req.transaction_hash.trim().to_lowercase();
    let to = req.to.trim().to_lowercase();
    let amount = wei_from_json(&req.amount);

    let mut errors = FieldErrors::new();
    errors.check(is_tx_hash(&hash), "transactionHash", INVALID_HASH);
    errors.check(amount.is_some(), "amount", "Amount must be a number");
    errors.check(is_eth_address(&to), "to", "Invalid recipient address");
    errors.into_result()?;
    let amount = amount.unwrap_or_default();

    let expected = ExpectedTransfer {
        recipient: &to,
        value_wei: amount,
        sender: None,
    };
    let verified = verify_transfer(state.chain.as_ref(), &hash, expected, polling(&state))
        .await
        .map_err(|e| {
            warn!(%hash, "Payment verification failed: {e}");
            transfer_error(e, &VERIFY_MESSAGES)
        })?;

    queries::insert_payment(
        &state.db,
        NewPayment {
            user_id: user.id,
            kind: PaymentKind::Verification,
            status: PaymentStatus::Completed,
            amount_wei: verified.value_wei,
            transaction_hash: Some(&hash),
            recipient: &verified.recipient,
            job_id: None,
            block_number: Some(verified.block_number),
        },
    )
    .await?;

    Ok(Json(VerifyResponse {
        message: "Payment verified successfully",
        transaction_hash: hash,
        block_number: verified.block_number,
        gas_used: verified.gas_used.to_string(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformFeeRequest {
    pub transaction_hash: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFeeResponse {
    pub message: &'static str,
    pub transaction_hash: String,
    pub amount: String,
    pub block_number: Option<i64>,
    pub payment: PaymentView,
}

fn fee_response(payment: PaymentRow) -> PlatformFeeResponse {
    let view = PaymentView::from(payment);
    PlatformFeeResponse {
        message: "Platform fee paid successfully",
        transaction_hash: view.payment.transaction_hash.clone().unwrap_or_default(),
        amount: view.amount.clone(),
        block_number: view.payment.block_number,
        payment: view,
    }
}

/// Resolves a platform fee hash that is already on record: the payer gets
/// the existing payment back, anyone else is refused.
fn existing_fee(payment: PaymentRow, user_id: Uuid) -> Result<PlatformFeeResponse, AppError> {
    if payment.user_id == user_id {
        Ok(fee_response(payment))
    } else {
        Err(AppError::BadRequest(
            "This transaction has already been used".to_string(),
        ))
    }
}

/// The wallet a platform fee must come from.
fn fee_payer(user: &UserRow) -> Result<&str, AppError> {
    user.wallet_address.as_deref().ok_or_else(|| {
        AppError::BadRequest("Connect your wallet before paying the platform fee".to_string())
    })
}

/// POST /api/payments/platform-fee
pub async fn platform_fee(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<PlatformFeeRequest>,
) -> Result<Json<PlatformFeeResponse>, AppError> {
    let hash = req.transaction_hash.trim().to_lowercase();
    if !is_tx_hash(&hash) {
        return Err(AppError::invalid("transactionHash", INVALID_HASH));
    }

    let payer = fee_payer(&user)?;

    if let Some(payment) = queries::find_platform_fee(&state.db, &hash).await? {
        return existing_fee(payment, user.id).map(Json);
    }

    let expected = ExpectedTransfer {
        recipient: &state.config.platform_wallet_address,
        value_wei: state.config.platform_fee_wei,
        sender: Some(payer),
    };
    let verified: VerifiedTransfer = verify_transfer(
        state.chain.as_ref(),
        &hash,
        expected,
        polling(&state),
    )
    .await
    .map_err(|e| {
        warn!(%hash, user_id = %user.id, "Platform fee rejected: {e}");
        transfer_error(e, &PLATFORM_FEE_MESSAGES)
    })?;

    let inserted = queries::insert_payment(
        &state.db,
        NewPayment {
            user_id: user.id,
            kind: PaymentKind::PlatformFee,
            status: PaymentStatus::Completed,
            amount_wei: verified.value_wei,
            transaction_hash: Some(&hash),
            recipient: &verified.recipient,
            job_id: None,
            block_number: Some(verified.block_number),
        },
    )
    .await;

    let payment = match inserted {
        Ok(payment) => payment,
        Err(e) if is_unique_violation(&e, PLATFORM_FEE_TX_CONSTRAINT) => {
            let payment = queries::find_platform_fee(&state.db, &hash)
                .await?
                .ok_or(AppError::Database(e))?;
            return existing_fee(payment, user.id).map(Json);
        }
        Err(e) => return Err(e.into()),
    };

    info!(%hash, user_id = %user.id, "Platform fee recorded");
    Ok(Json(fee_response(payment)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFeeInfo {
    pub amount: String,
    pub currency: &'static str,
    pub wallet_address: String,
    pub description: &'static str,
}

/// GET /api/payments/platform-fee-info
pub async fn platform_fee_info(State(state): State<AppState>) -> Json<PlatformFeeInfo> {
    Json(PlatformFeeInfo {
        amount: format_ether(state.config.platform_fee_wei),
        currency: "ETH",
        wallet_address: state.config.platform_wallet_address.clone(),
        description: "Platform fee for job posting",
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Escrow
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EscrowRequest {
    pub job_id: String,
    pub amount: Option<Value>,
    pub recipient_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowResponse {
    pub message: &'static str,
    pub escrow_id: Uuid,
    pub amount: String,
    pub recipient_address: String,
    pub status: PaymentStatus,
}

/// POST /api/payments/escrow
pub async fn create_escrow(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<EscrowRequest>,
) -> Result<Json<EscrowResponse>, AppError> {
    let job_id = Uuid::parse_str(req.job_id.trim()).ok();
    let amount = wei_from_json(&req.amount);
    let recipient = req.recipient_address.trim().to_lowercase();

    let mut errors = FieldErrors::new();
    errors.check(job_id.is_some(), "jobId", "Invalid job ID");
    errors.check(amount.is_some(), "amount", "Amount must be a number");
    errors.check(
        is_eth_address(&recipient),
        "recipientAddress",
        "Invalid recipient address",
    );
    errors.into_result()?;
    let (job_id, amount) = (job_id.unwrap_or_default(), amount.unwrap_or_default());

    let job = job_queries::find_job(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
    ensure_owner(&job, user.id, "create an escrow for this job")?;

    let escrow = queries::insert_payment(
        &state.db,
        NewPayment {
            user_id: user.id,
            kind: PaymentKind::Escrow,
            status: PaymentStatus::Pending,
            amount_wei: amount,
            transaction_hash: None,
            recipient: &recipient,
            job_id: Some(job.id),
            block_number: None,
        },
    )
    .await?;

    info!(escrow_id = %escrow.id, job_id = %job.id, "Escrow created");
    Ok(Json(EscrowResponse {
        message: "Escrow created successfully",
        escrow_id: escrow.id,
        amount: format_ether(amount),
        recipient_address: escrow.recipient,
        status: escrow.status,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleaseEscrowRequest {
    pub escrow_id: String,
    pub transaction_hash: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEscrowResponse {
    pub message: &'static str,
    pub escrow_id: Uuid,
    pub transaction_hash: String,
    pub status: PaymentStatus,
}

/// POST /api/payments/release-escrow
pub async fn release_escrow(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<ReleaseEscrowRequest>,
) -> Result<Json<ReleaseEscrowResponse>, AppError> {
    let escrow_id = Uuid::parse_str(req.escrow_id.trim()).ok();
    let hash = req.transaction_hash.trim().to_lowercase();

    let mut errors = FieldErrors::new();
    errors.check(escrow_id.is_some(), "escrowId", "Escrow ID is required");
    errors.check(is_tx_hash(&hash), "transactionHash", INVALID_HASH);
    errors.into_result()?;
    let escrow_id = escrow_id.unwrap_or_default();

    let escrow = queries::find_user_payment(&state.db, escrow_id, user.id)
        .await?
        .filter(|p| p.kind == PaymentKind::Escrow)
        .ok_or_else(|| AppError::NotFound("Escrow not found".to_string()))?;
    if escrow.status != PaymentStatus::Pending {
        return Err(AppError::BadRequest("Escrow is not pending".to_string()));
    }

    let released = queries::release_escrow(&state.db, escrow.id, &hash)
        .await?
        .ok_or_else(|| AppError::BadRequest("Escrow is not pending".to_string()))?;

    info!(escrow_id = %released.id, %hash, "Escrow released");
    Ok(Json(ReleaseEscrowResponse {
        message: "Escrow released successfully",
        escrow_id: released.id,
        transaction_hash: hash,
        status: released.status,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// History
// ────────────────────────────────────────────────────────────────────────────

/// Stored payment plus its amount in ether.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: PaymentRow,
    pub amount: String,
}

impl From<PaymentRow> for PaymentView {
    fn from(payment: PaymentRow) -> Self {
        let amount = parse_wei(&payment.amount_wei)
            .map(format_ether)
            .unwrap_or_else(|| payment.amount_wei.clone());
        PaymentView { payment, amount }
    }
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub payments: Vec<PaymentView>,
    pub pagination: Pagination,
}

/// GET /api/payments/history
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(page): AppQuery<PageParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let (payments, total) =
        queries::payment_history(&state.db, user.id, page.limit(), page.offset()).await?;
    Ok(Json(HistoryResponse {
        payments: payments.into_iter().map(PaymentView::from).collect(),
        pagination: page.envelope(total),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn payment(amount_wei: &str) -> PaymentRow {
        PaymentRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: PaymentKind::PlatformFee,
            status: PaymentStatus::Completed,
            amount_wei: amount_wei.to_string(),
            currency: "ETH".to_string(),
            transaction_hash: Some(format!("0x{}", "ab".repeat(32))),
            recipient: "0x1234567890123456789012345678901234567890".to_string(),
            job_id: None,
            claimed_at: None,
            block_number: Some(12),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_wei_from_json() {
        assert_eq!(wei_from_json(&Some(json!("1000000000000000"))), Some(1_000_000_000_000_000));
        assert_eq!(wei_from_json(&Some(json!(5000))), Some(5000));
        assert_eq!(wei_from_json(&Some(json!(-1))), None);
        assert_eq!(wei_from_json(&Some(json!(0.5))), None);
        assert_eq!(wei_from_json(&None), None);
    }

    #[test]
    fn test_transfer_error_messages() {
        let msg = |e: AppError| match e {
            AppError::BadRequest(m) => m,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(
            msg(transfer_error(TransferError::WrongAmount, &PLATFORM_FEE_MESSAGES)),
            "Incorrect platform fee amount"
        );
        assert_eq!(
            msg(transfer_error(TransferError::WrongRecipient, &VERIFY_MESSAGES)),
            "Transaction recipient does not match"
        );
        assert_eq!(
            msg(transfer_error(TransferError::NotFound, &VERIFY_MESSAGES)),
            "Transaction not found"
        );
        assert_eq!(
            msg(transfer_error(TransferError::WrongSender, &PLATFORM_FEE_MESSAGES)),
            "Platform fee was not paid from your connected wallet"
        );
    }

    #[test]
    fn test_fee_payer_needs_connected_wallet() {
        let mut user = crate::users::profile::tests::make_user("Ada");
        user.wallet_address = None;
        assert!(matches!(fee_payer(&user), Err(AppError::BadRequest(_))));

        let wallet = "0x00000000000000000000000000000000000000aa";
        user.wallet_address = Some(wallet.to_string());
        assert_eq!(fee_payer(&user).unwrap(), wallet);
    }

    #[test]
    fn test_payment_view_json() {
        let json = serde_json::to_value(PaymentView::from(payment("1000000000000000"))).unwrap();
        assert_eq!(json["amount"], "0.001");
        assert_eq!(json["amountWei"], "1000000000000000");
        assert_eq!(json["type"], "platform_fee");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["blockNumber"], 12);
    }

    #[test]
    fn test_existing_fee_is_idempotent_for_payer_only() {
        let fee = payment("1000000000000000");
        let payer = fee.user_id;
        assert!(existing_fee(fee.clone(), payer).is_ok());
        assert!(matches!(
            existing_fee(fee, Uuid::new_v4()),
            Err(AppError::BadRequest(_))
        ));
    }
}
