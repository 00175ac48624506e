use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::payment::{PaymentKind, PaymentRow, PaymentStatus};

pub const PLATFORM_FEE_TX_CONSTRAINT: &str = "payments_platform_fee_tx_key";

pub struct NewPayment<'a> {
    pub user_id: Uuid,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub amount_wei: u128,
    pub transaction_hash: Option<&'a str>,
    pub recipient: &'a str,
    pub job_id: Option<Uuid>,
    pub block_number: Option<u64>,
}

pub async fn insert_payment<'e, E>(executor: E, payment: NewPayment<'_>) -> Result<PaymentRow, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PaymentRow>(
        r#"
        INSERT INTO payments
            (id, user_id, kind, status, amount_wei, currency, transaction_hash, recipient,
             job_id, block_number)
        VALUES ($1, $2, $3, $4, $5, 'ETH', $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payment.user_id)
    .bind(payment.kind)
    .bind(payment.status)
    .bind(payment.amount_wei.to_string())
    .bind(payment.transaction_hash)
    .bind(payment.recipient)
    .bind(payment.job_id)
    .bind(payment.block_number.map(|n| n as i64))
    .fetch_one(executor)
    .await
}

pub async fn find_platform_fee(pool: &PgPool, hash: &str) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>(
        "SELECT * FROM payments WHERE kind = 'platform_fee' AND transaction_hash = $1",
    )
    .bind(hash)
    .fetch_optional(pool)
    .await
}

const CLAIM_PLATFORM_FEE: &str = r#"
    UPDATE payments SET job_id = $3, claimed_at = NOW(), updated_at = NOW()
    WHERE kind = 'platform_fee' AND status = 'completed'
      AND transaction_hash = $2 AND user_id = $1 AND claimed_at IS NULL
    RETURNING *
"#;

/// Attaches the caller's unused, completed platform fee `hash` to `job_id`.
/// Returns `None` if there is no such payment or it was ever claimed, even
/// by a job that has since been deleted.
pub async fn claim_platform_fee<'e, E>(
    executor: E,
    user_id: Uuid,
    hash: &str,
    job_id: Uuid,
) -> Result<Option<PaymentRow>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PaymentRow>(CLAIM_PLATFORM_FEE)
        .bind(user_id)
        .bind(hash)
        .bind(job_id)
        .fetch_optional(executor)
        .await
}

pub async fn find_user_payment(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Moves a pending escrow to `released`. `None` if it was not pending.
pub async fn release_escrow(
    pool: &PgPool,
    id: Uuid,
    hash: &str,
) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>(
        r#"
        UPDATE payments SET status = 'released', transaction_hash = $2, updated_at = NOW()
        WHERE id = $1 AND kind = 'escrow' AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(hash)
    .fetch_optional(pool)
    .await
}

/// Newest-first page of a user's payments, plus their total count.
pub async fn payment_history(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PaymentRow>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    let payments = sqlx::query_as::<_, PaymentRow>(
        "SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok((payments, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_claim_keys_on_claimed_at_not_job() {
        assert!(CLAIM_PLATFORM_FEE.contains("claimed_at IS NULL"));
        assert!(CLAIM_PLATFORM_FEE.contains("claimed_at = NOW()"));
        assert!(!CLAIM_PLATFORM_FEE.contains("job_id IS NULL"));
    }
}
