use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::WalletTransaction;
use crate::db::types::WalletTransactionKind;
use crate::repositories;

#[derive(Debug, Error)]
pub(crate) enum PaymentError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("payment failed: {0}")]
    Failed(String),
}

impl From<sqlx::Error> for PaymentError {
    fn from(err: sqlx::Error) -> Self {
        PaymentError::Failed(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PaymentReceipt {
    pub(crate) transaction_id: String,
    pub(crate) amount_cents: i64,
    /// Set when the reference had already been processed.
    pub(crate) replayed: bool,
}

/// Money movements consumed by the exam core. Every call carries a unique
/// reference; repeating a reference returns the original receipt.
#[async_trait]
pub(crate) trait PaymentGateway: Send + Sync {
    async fn debit(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError>;

    async fn refund(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError>;

    async fn credit_prize(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError>;

    async fn deposit(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError>;

    async fn balance(&self, user_id: &str) -> Result<i64, PaymentError>;

    async fn history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, PaymentError>;
}

pub(crate) fn attempt_debit_reference(attempt_id: &str) -> String {
    format!("attempt:{attempt_id}")
}

pub(crate) fn attempt_refund_reference(attempt_id: &str) -> String {
    format!("attempt-refund:{attempt_id}")
}

pub(crate) fn prize_reference(exam_id: &str, position: i32) -> String {
    format!("prize:{exam_id}:{position}")
}

/// Wallet ledger kept in PostgreSQL next to the exam data.
#[derive(Clone)]
pub(crate) struct LedgerPayments {
    pool: PgPool,
}

impl LedgerPayments {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply(
        &self,
        kind: WalletTransactionKind,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError> {
        if amount_cents <= 0 {
            return Err(PaymentError::InvalidAmount);
        }

        let mut tx = self.pool.begin().await?;

        if let Some(existing) =
            repositories::wallets::find_transaction_by_reference(&mut *tx, reference).await?
        {
            return replay(existing, kind, user_id);
        }

        let now = primitive_now_utc();
        match kind {
            WalletTransactionKind::Debit => {
                let debited =
                    repositories::wallets::debit_balance(&mut *tx, user_id, amount_cents, now)
                        .await?;
                if !debited {
                    return Err(PaymentError::InsufficientFunds);
                }
            }
            WalletTransactionKind::Deposit
            | WalletTransactionKind::Refund
            | WalletTransactionKind::Prize => {
                repositories::wallets::credit_balance(&mut *tx, user_id, amount_cents, now).await?;
            }
        }

        let transaction_id = Uuid::new_v4().to_string();
        let inserted = repositories::wallets::insert_transaction(
            &mut *tx,
            repositories::wallets::CreateTransaction {
                id: &transaction_id,
                user_id,
                kind,
                amount_cents,
                reference,
                created_at: now,
            },
        )
        .await?;

        if !inserted {
            // A concurrent call with the same reference committed first.
            tx.rollback().await?;
            let existing =
                repositories::wallets::find_transaction_by_reference(&self.pool, reference)
                    .await?
                    .ok_or_else(|| PaymentError::Failed("reference vanished".to_string()))?;
            return replay(existing, kind, user_id);
        }

        tx.commit().await?;

        tracing::info!(
            user_id,
            reference,
            amount_cents,
            kind = ?kind,
            "Wallet transaction recorded"
        );

        Ok(PaymentReceipt { transaction_id, amount_cents, replayed: false })
    }
}

fn replay(
    existing: WalletTransaction,
    kind: WalletTransactionKind,
    user_id: &str,
) -> Result<PaymentReceipt, PaymentError> {
    if existing.kind != kind || existing.user_id != user_id {
        return Err(PaymentError::Failed(format!(
            "reference {} already used for another transaction",
            existing.reference
        )));
    }

    Ok(PaymentReceipt {
        transaction_id: existing.id,
        amount_cents: existing.amount_cents,
        replayed: true,
    })
}

#[async_trait]
impl PaymentGateway for LedgerPayments {
    async fn debit(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.apply(WalletTransactionKind::Debit, user_id, amount_cents, reference).await
    }

    async fn refund(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.apply(WalletTransactionKind::Refund, user_id, amount_cents, reference).await
    }

    async fn credit_prize(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.apply(WalletTransactionKind::Prize, user_id, amount_cents, reference).await
    }

    async fn deposit(
        &self,
        user_id: &str,
        amount_cents: i64,
        reference: &str,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.apply(WalletTransactionKind::Deposit, user_id, amount_cents, reference).await
    }

    async fn balance(&self, user_id: &str) -> Result<i64, PaymentError> {
        Ok(repositories::wallets::balance(&self.pool, user_id).await?)
    }

    async fn history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, PaymentError> {
        Ok(repositories::wallets::list_transactions(&self.pool, user_id, limit).await?)
    }
}
