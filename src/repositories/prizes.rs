use time::PrimitiveDateTime;

use crate::db::models::PrizeAward;

pub(crate) const COLUMNS: &str = "\
    exam_id, position, attempt_id, student_id, amount_cents, transaction_id, created_at, paid_at";

pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<PrizeAward>, sqlx::Error> {
    sqlx::query_as::<_, PrizeAward>(&format!(
        "SELECT {COLUMNS} FROM prize_awards WHERE exam_id = $1 ORDER BY position"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

/// First writer freezes the payout table; later inserts for the same position are ignored.
pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    award: &PrizeAward,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO prize_awards (
            exam_id, position, attempt_id, student_id, amount_cents, transaction_id,
            created_at, paid_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (exam_id, position) DO NOTHING",
    )
    .bind(&award.exam_id)
    .bind(award.position)
    .bind(&award.attempt_id)
    .bind(&award.student_id)
    .bind(award.amount_cents)
    .bind(&award.transaction_id)
    .bind(award.created_at)
    .bind(award.paid_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn mark_paid(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    position: i32,
    transaction_id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE prize_awards SET transaction_id = $3, paid_at = $4
         WHERE exam_id = $1 AND position = $2 AND paid_at IS NULL",
    )
    .bind(exam_id)
    .bind(position)
    .bind(transaction_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
