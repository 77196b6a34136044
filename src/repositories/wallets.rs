use time::PrimitiveDateTime;

use crate::db::models::WalletTransaction;
use crate::db::types::WalletTransactionKind;

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, user_id, kind, amount_cents, reference, created_at";

pub(crate) struct CreateTransaction<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) kind: WalletTransactionKind,
    pub(crate) amount_cents: i64,
    pub(crate) reference: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn balance(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT balance_cents FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
    Ok(balance.unwrap_or(0))
}

/// Withdraws only when the balance covers the amount.
pub(crate) async fn debit_balance(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    amount_cents: i64,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE wallets SET balance_cents = balance_cents - $2, updated_at = $3
         WHERE user_id = $1 AND balance_cents >= $2",
    )
    .bind(user_id)
    .bind(amount_cents)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn credit_balance(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    amount_cents: i64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO wallets (user_id, balance_cents, updated_at) VALUES ($1, $2, $3)
         ON CONFLICT (user_id) DO UPDATE
         SET balance_cents = wallets.balance_cents + EXCLUDED.balance_cents,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(user_id)
    .bind(amount_cents)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn find_transaction_by_reference(
    executor: impl sqlx::PgExecutor<'_>,
    reference: &str,
) -> Result<Option<WalletTransaction>, sqlx::Error> {
    sqlx::query_as::<_, WalletTransaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions WHERE reference = $1"
    ))
    .bind(reference)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn insert_transaction(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTransaction<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO wallet_transactions (id, user_id, kind, amount_cents, reference, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (reference) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.kind)
    .bind(params.amount_cents)
    .bind(params.reference)
    .bind(params.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_transactions(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    limit: i64,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    sqlx::query_as::<_, WalletTransaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions
         WHERE user_id = $1
         ORDER BY created_at DESC, id
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit.clamp(1, 500))
    .fetch_all(executor)
    .await
}
