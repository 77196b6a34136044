use time::PrimitiveDateTime;

use crate::db::models::Attempt;
use crate::db::types::{AttemptStatus, GradingStatus};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, status, started_at, expires_at, submitted_at, score, \
    total_score, grading_status, answers_revision, question_snapshot, \
    payment_transaction_id, created_at, updated_at";

pub(crate) struct CloseAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) expected_revision: i64,
    pub(crate) status: AttemptStatus,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) score: f64,
    pub(crate) grading_status: GradingStatus,
    pub(crate) now: PrimitiveDateTime,
}

/// Inserts a new attempt. Returns `false` when the one-in-progress index already
/// holds an attempt for the same exam and student.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: &Attempt,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (
            id, exam_id, student_id, status, started_at, expires_at, submitted_at, score,
            total_score, grading_status, answers_revision, question_snapshot,
            payment_transaction_id, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
        ON CONFLICT DO NOTHING",
    )
    .bind(&attempt.id)
    .bind(&attempt.exam_id)
    .bind(&attempt.student_id)
    .bind(attempt.status)
    .bind(attempt.started_at)
    .bind(attempt.expires_at)
    .bind(attempt.submitted_at)
    .bind(attempt.score)
    .bind(attempt.total_score)
    .bind(attempt.grading_status)
    .bind(attempt.answers_revision)
    .bind(&attempt.question_snapshot)
    .bind(&attempt.payment_transaction_id)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE exam_id = $1 AND student_id = $2 AND status = $3"
    ))
    .bind(exam_id)
    .bind(student_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Claims the attempt row for an answer write. `None` means the attempt is no
/// longer open (closed or past its deadline).
pub(crate) async fn bump_revision(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE attempts
         SET answers_revision = answers_revision + 1, updated_at = $2
         WHERE id = $1 AND status = $3 AND expires_at > $2
         RETURNING answers_revision",
    )
    .bind(id)
    .bind(now)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Terminal transition. Matches only an in-progress row whose answers did not
/// change since they were scored and whose deadline agrees with the target
/// status; zero rows means another writer won.
pub(crate) async fn close(
    executor: impl sqlx::PgExecutor<'_>,
    params: CloseAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let deadline_condition = match params.status {
        AttemptStatus::Completed => "expires_at > $7",
        AttemptStatus::TimedOut => "expires_at <= $7",
        AttemptStatus::InProgress => return Ok(false),
    };

    let result = sqlx::query(&format!(
        "UPDATE attempts
         SET status = $3, submitted_at = $4, score = $5, grading_status = $6, updated_at = $7
         WHERE id = $1 AND answers_revision = $2 AND status = $8 AND {deadline_condition}"
    ))
    .bind(params.id)
    .bind(params.expected_revision)
    .bind(params.status)
    .bind(params.submitted_at)
    .bind(params.score)
    .bind(params.grading_status)
    .bind(params.now)
    .bind(AttemptStatus::InProgress)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_expired_ids(
    executor: impl sqlx::PgExecutor<'_>,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM attempts
         WHERE status = $1 AND expires_at <= $2
         ORDER BY expires_at, id
         LIMIT $3",
    )
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .bind(limit.max(1))
    .fetch_all(executor)
    .await
}

/// Finished attempts of an exam; timed-out ones only when asked for.
pub(crate) async fn list_finished_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    include_timed_out: bool,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts
         WHERE exam_id = $1 AND (status = $2 OR ($3 AND status = $4))"
    ))
    .bind(exam_id)
    .bind(AttemptStatus::Completed)
    .bind(include_timed_out)
    .bind(AttemptStatus::TimedOut)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_in_progress_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE exam_id = $1 AND status = $2")
        .bind(exam_id)
        .bind(AttemptStatus::InProgress)
        .fetch_one(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Re-derives score and grading status of a finished attempt from its answers.
pub(crate) async fn refresh_score(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE attempts
         SET score = (
                 SELECT COALESCE(SUM(points_awarded), 0) FROM answers WHERE attempt_id = $1
             ),
             grading_status = CASE
                 WHEN EXISTS (
                     SELECT 1 FROM answers
                     WHERE attempt_id = $1 AND grade_state IN ('pending_manual', 'ungraded')
                 ) THEN 'awaiting_manual'::gradingstatus
                 ELSE 'complete'::gradingstatus
             END,
             updated_at = $2
         WHERE id = $1 AND status <> $3
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(now)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}
