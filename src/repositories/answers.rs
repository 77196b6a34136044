use time::PrimitiveDateTime;

use crate::db::models::Answer;
use crate::db::types::GradeState;

pub(crate) const COLUMNS: &str = "\
    id, attempt_id, question_id, selected_option_id, content, is_correct, points_awarded, \
    grade_state, graded_by, graded_at, created_at, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_option_id: Option<&'a str>,
    pub(crate) content: Option<&'a str>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct WriteGrade<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_option_id: Option<&'a str>,
    pub(crate) content: Option<&'a str>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) grade_state: GradeState,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct ManualGrade<'a> {
    pub(crate) attempt_id: &'a str,
    pub(crate) answer_id: &'a str,
    pub(crate) points: f64,
    pub(crate) is_correct: bool,
    pub(crate) graded_by: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

/// Last write wins per (attempt, question).
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO answers (
            id, attempt_id, question_id, selected_option_id, content, grade_state,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET selected_option_id = EXCLUDED.selected_option_id,
            content = EXCLUDED.content,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.selected_option_id)
    .bind(params.content)
    .bind(GradeState::Ungraded)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Stores the close-time grade, creating the row for unanswered questions.
pub(crate) async fn write_grade(
    executor: impl sqlx::PgExecutor<'_>,
    params: WriteGrade<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO answers (
            id, attempt_id, question_id, selected_option_id, content, is_correct,
            points_awarded, grade_state, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET is_correct = EXCLUDED.is_correct,
            points_awarded = EXCLUDED.points_awarded,
            grade_state = EXCLUDED.grade_state,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.selected_option_id)
    .bind(params.content)
    .bind(params.is_correct)
    .bind(params.points_awarded)
    .bind(params.grade_state)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE attempt_id = $1 ORDER BY created_at, id"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// Applies a human grade. Only answers awaiting or already holding a manual grade match.
pub(crate) async fn set_manual_grade(
    executor: impl sqlx::PgExecutor<'_>,
    params: ManualGrade<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE answers
         SET points_awarded = $3, is_correct = $4, grade_state = $5,
             graded_by = $6, graded_at = $7, updated_at = $7
         WHERE id = $1 AND attempt_id = $2 AND grade_state IN ('pending_manual', 'manual')",
    )
    .bind(params.answer_id)
    .bind(params.attempt_id)
    .bind(params.points)
    .bind(params.is_correct)
    .bind(GradeState::Manual)
    .bind(params.graded_by)
    .bind(params.now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
