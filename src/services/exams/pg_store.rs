use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Answer, Attempt, Exam, ExamContent, PrizeAward};
use crate::db::types::ExamStatus;
use crate::repositories;
use crate::services::exams::errors::StoreError;
use crate::services::exams::store::{
    AnswerWrite, AttemptStore, CloseRequest, GradeRequest, NewAnswer,
};

#[derive(Clone)]
pub(crate) struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn create_exam(&self, content: &ExamContent) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        repositories::exams::create(&mut *tx, &content.exam).await?;
        for text in &content.reading_texts {
            repositories::exams::insert_reading_text(&mut *tx, text).await?;
        }
        for question in &content.questions {
            repositories::exams::insert_question(&mut *tx, question).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_exam(&self, exam_id: &str) -> Result<Option<Exam>, StoreError> {
        Ok(repositories::exams::find_by_id(&self.pool, exam_id).await?)
    }

    async fn load_exam_content(&self, exam_id: &str) -> Result<Option<ExamContent>, StoreError> {
        let Some(exam) = repositories::exams::find_by_id(&self.pool, exam_id).await? else {
            return Ok(None);
        };

        let reading_texts = repositories::exams::list_reading_texts(&self.pool, exam_id).await?;
        let questions = repositories::exams::list_questions(&self.pool, exam_id).await?;

        Ok(Some(ExamContent { exam, reading_texts, questions }))
    }

    async fn transition_exam(
        &self,
        exam_id: &str,
        from: ExamStatus,
        to: ExamStatus,
        now: PrimitiveDateTime,
    ) -> Result<bool, StoreError> {
        Ok(repositories::exams::transition_status(&self.pool, exam_id, from, to, now).await?)
    }

    async fn find_in_progress(
        &self,
        exam_id: &str,
        student_id: &str,
    ) -> Result<Option<Attempt>, StoreError> {
        Ok(repositories::attempts::find_in_progress(&self.pool, exam_id, student_id).await?)
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> Result<bool, StoreError> {
        Ok(repositories::attempts::create(&self.pool, attempt).await?)
    }

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>, StoreError> {
        Ok(repositories::attempts::find_by_id(&self.pool, attempt_id).await?)
    }

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<Answer>, StoreError> {
        Ok(repositories::answers::list_by_attempt(&self.pool, attempt_id).await?)
    }

    async fn save_answers(
        &self,
        attempt_id: &str,
        answers: &[NewAnswer],
        now: PrimitiveDateTime,
    ) -> Result<AnswerWrite, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The revision bump holds the attempt row lock until commit, so a
        // concurrent close either waits for these answers or sees a new revision.
        let Some(revision) = repositories::attempts::bump_revision(&mut *tx, attempt_id, now).await?
        else {
            tx.rollback().await?;
            return Ok(AnswerWrite::Closed);
        };

        for answer in answers {
            let id = Uuid::new_v4().to_string();
            repositories::answers::upsert(
                &mut *tx,
                repositories::answers::UpsertAnswer {
                    id: &id,
                    attempt_id,
                    question_id: &answer.question_id,
                    selected_option_id: answer.selected_option_id.as_deref(),
                    content: answer.content.as_deref(),
                    now,
                },
            )
            .await?;
        }

        tx.commit().await?;
        Ok(AnswerWrite::Saved { revision })
    }

    async fn close_attempt(&self, request: &CloseRequest) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let closed = repositories::attempts::close(
            &mut *tx,
            repositories::attempts::CloseAttempt {
                id: &request.attempt_id,
                expected_revision: request.expected_revision,
                status: request.status,
                submitted_at: request.submitted_at,
                score: request.score,
                grading_status: request.grading_status,
                now: request.now,
            },
        )
        .await?;

        if !closed {
            tx.rollback().await?;
            return Ok(false);
        }

        for answer in &request.answers {
            let id = Uuid::new_v4().to_string();
            repositories::answers::write_grade(
                &mut *tx,
                repositories::answers::WriteGrade {
                    id: &id,
                    attempt_id: &request.attempt_id,
                    question_id: &answer.question_id,
                    selected_option_id: answer.selected_option_id.as_deref(),
                    content: answer.content.as_deref(),
                    is_correct: answer.is_correct,
                    points_awarded: answer.points_awarded,
                    grade_state: answer.grade_state,
                    now: request.now,
                },
            )
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_expired(
        &self,
        now: PrimitiveDateTime,
        limit: u32,
    ) -> Result<Vec<String>, StoreError> {
        Ok(repositories::attempts::list_expired_ids(&self.pool, now, i64::from(limit)).await?)
    }

    async fn list_finished(
        &self,
        exam_id: &str,
        include_timed_out: bool,
    ) -> Result<Vec<Attempt>, StoreError> {
        Ok(repositories::attempts::list_finished_by_exam(&self.pool, exam_id, include_timed_out)
            .await?)
    }

    async fn count_in_progress(&self, exam_id: &str) -> Result<i64, StoreError> {
        Ok(repositories::attempts::count_in_progress_by_exam(&self.pool, exam_id).await?)
    }

    async fn apply_manual_grade(
        &self,
        request: &GradeRequest,
    ) -> Result<Option<Attempt>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let locked = repositories::attempts::lock_by_id(&mut *tx, &request.attempt_id).await?;
        if !locked.is_some_and(|attempt| attempt.status.is_terminal()) {
            tx.rollback().await?;
            return Ok(None);
        }

        let graded = repositories::answers::set_manual_grade(
            &mut *tx,
            repositories::answers::ManualGrade {
                attempt_id: &request.attempt_id,
                answer_id: &request.answer_id,
                points: request.points,
                is_correct: request.is_correct,
                graded_by: &request.graded_by,
                now: request.now,
            },
        )
        .await?;
        if !graded {
            tx.rollback().await?;
            return Ok(None);
        }

        let attempt =
            repositories::attempts::refresh_score(&mut *tx, &request.attempt_id, request.now)
                .await?
                .ok_or_else(|| StoreError::Corrupt("graded attempt vanished".to_string()))?;

        tx.commit().await?;
        Ok(Some(attempt))
    }

    async fn list_prize_awards(&self, exam_id: &str) -> Result<Vec<PrizeAward>, StoreError> {
        Ok(repositories::prizes::list_by_exam(&self.pool, exam_id).await?)
    }

    async fn freeze_prize_awards(
        &self,
        exam_id: &str,
        awards: &[PrizeAward],
    ) -> Result<Vec<PrizeAward>, StoreError> {
        let mut tx = self.pool.begin().await?;
        for award in awards {
            repositories::prizes::insert(&mut *tx, award).await?;
        }
        let frozen = repositories::prizes::list_by_exam(&mut *tx, exam_id).await?;
        tx.commit().await?;
        Ok(frozen)
    }

    async fn mark_prize_paid(
        &self,
        exam_id: &str,
        position: i32,
        transaction_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<bool, StoreError> {
        Ok(repositories::prizes::mark_paid(&self.pool, exam_id, position, transaction_id, now)
            .await?)
    }
}
