use time::PrimitiveDateTime;

use crate::db::models::{Exam, Question, ReadingText};
use crate::db::types::ExamStatus;

pub(crate) const COLUMNS: &str = "\
    id, owner_id, title, description, status, duration_minutes, price_cents, \
    prize_pool_cents, prize_shares_bps, rank_timed_out, created_at, updated_at, published_at";

pub(crate) const READING_TEXT_COLUMNS: &str = "id, exam_id, order_index, title, body";

pub(crate) const QUESTION_COLUMNS: &str = "\
    id, exam_id, order_index, question_type, prompt, points, options, \
    correct_option_id, model_answer, reading_text_id";

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    exam: &Exam,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exams (
            id, owner_id, title, description, status, duration_minutes, price_cents,
            prize_pool_cents, prize_shares_bps, rank_timed_out, created_at, updated_at, published_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
    )
    .bind(&exam.id)
    .bind(&exam.owner_id)
    .bind(&exam.title)
    .bind(&exam.description)
    .bind(exam.status)
    .bind(exam.duration_minutes)
    .bind(exam.price_cents)
    .bind(exam.prize_pool_cents)
    .bind(&exam.prize_shares_bps)
    .bind(exam.rank_timed_out)
    .bind(exam.created_at)
    .bind(exam.updated_at)
    .bind(exam.published_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn insert_reading_text(
    executor: impl sqlx::PgExecutor<'_>,
    text: &ReadingText,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reading_texts (id, exam_id, order_index, title, body)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&text.id)
    .bind(&text.exam_id)
    .bind(text.order_index)
    .bind(&text.title)
    .bind(&text.body)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn insert_question(
    executor: impl sqlx::PgExecutor<'_>,
    question: &Question,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, exam_id, order_index, question_type, prompt, points, options,
            correct_option_id, model_answer, reading_text_id
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
    )
    .bind(&question.id)
    .bind(&question.exam_id)
    .bind(question.order_index)
    .bind(question.question_type)
    .bind(&question.prompt)
    .bind(question.points)
    .bind(&question.options)
    .bind(&question.correct_option_id)
    .bind(&question.model_answer)
    .bind(&question.reading_text_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_reading_texts(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<ReadingText>, sqlx::Error> {
    sqlx::query_as::<_, ReadingText>(&format!(
        "SELECT {READING_TEXT_COLUMNS} FROM reading_texts WHERE exam_id = $1 ORDER BY order_index"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_questions(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY order_index"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

/// Moves an exam between lifecycle states only from the expected one.
pub(crate) async fn transition_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    from: ExamStatus,
    to: ExamStatus,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exams
         SET status = $3,
             updated_at = $4,
             published_at = CASE WHEN $3 = 'published'::examstatus THEN $4 ELSE published_at END
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
