use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::schemas::wallet::{DepositRequest, DepositResponse, WalletResponse};
use crate::services::payments::PaymentError;

const HISTORY_LIMIT: i64 = 50;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(my_wallet))
        .route("/:user_id/deposits", post(deposit))
}

async fn my_wallet(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<WalletResponse>, ApiError> {
    let payments = state.exams().payments();
    let balance_cents = payments.balance(&actor.user_id).await.map_err(payment_error)?;
    let transactions =
        payments.history(&actor.user_id, HISTORY_LIMIT).await.map_err(payment_error)?;

    Ok(Json(WalletResponse {
        user_id: actor.user_id,
        balance_cents,
        transactions: transactions.into_iter().map(Into::into).collect(),
    }))
}

async fn deposit(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<DepositRequest>,
) -> Result<(StatusCode, Json<DepositResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let payments = state.exams().payments();
    let reference = format!("deposit:{}", payload.reference);
    let receipt =
        payments.deposit(&user_id, payload.amount_cents, &reference).await.map_err(payment_error)?;
    let balance_cents = payments.balance(&user_id).await.map_err(payment_error)?;

    tracing::info!(
        user_id,
        admin_id = %admin.user_id,
        amount_cents = receipt.amount_cents,
        replayed = receipt.replayed,
        "Wallet deposit"
    );

    let status = if receipt.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(DepositResponse {
            transaction_id: receipt.transaction_id,
            amount_cents: receipt.amount_cents,
            replayed: receipt.replayed,
            balance_cents,
        }),
    ))
}

fn payment_error(err: PaymentError) -> ApiError {
    match err {
        PaymentError::InvalidAmount => ApiError::BadRequest(err.to_string()),
        PaymentError::InsufficientFunds => ApiError::PaymentRequired(err.to_string()),
        PaymentError::Failed(_) => ApiError::internal(err, "Wallet operation failed"),
    }
}
