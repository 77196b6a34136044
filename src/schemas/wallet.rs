use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::WalletTransaction;
use crate::db::types::WalletTransactionKind;

#[derive(Debug, Serialize)]
pub(crate) struct TransactionResponse {
    pub(crate) id: String,
    pub(crate) kind: WalletTransactionKind,
    pub(crate) amount_cents: i64,
    pub(crate) reference: String,
    pub(crate) created_at: String,
}

impl From<WalletTransaction> for TransactionResponse {
    fn from(tx: WalletTransaction) -> Self {
        TransactionResponse {
            id: tx.id,
            kind: tx.kind,
            amount_cents: tx.amount_cents,
            reference: tx.reference,
            created_at: format_primitive(tx.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WalletResponse {
    pub(crate) user_id: String,
    pub(crate) balance_cents: i64,
    pub(crate) transactions: Vec<TransactionResponse>,
}

/// `reference` makes the deposit idempotent: repeating it returns the first receipt.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DepositRequest {
    #[serde(alias = "amountCents")]
    #[validate(range(min = 1, message = "amount_cents must be positive"))]
    pub(crate) amount_cents: i64,
    #[validate(length(min = 1, max = 128, message = "reference must be 1-128 characters"))]
    pub(crate) reference: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DepositResponse {
    pub(crate) transaction_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) replayed: bool,
    pub(crate) balance_cents: i64,
}
