use std::collections::HashMap;

use sqlx::types::Json;
use uuid::Uuid;

use crate::db::models::{Attempt, Question, SnapshotQuestion};
use crate::db::types::{AttemptStatus, ExamStatus, GradingMode, GradingStatus};
use crate::services::payments::{attempt_debit_reference, attempt_refund_reference};
use crate::services::{deadline, scoring};

use super::{
    AnswerWrite, AttemptError, AttemptResult, AttemptView, CloseRequest, ExamService, NewAnswer,
    SavedAnswers, SweepReport,
};

const MAX_ANSWER_CHARS: usize = 20_000;

impl ExamService {
    pub(crate) async fn start_attempt(
        &self,
        exam_id: &str,
        student_id: &str,
    ) -> Result<Attempt, AttemptError> {
        let content = self
            .store
            .load_exam_content(exam_id)
            .await?
            .filter(|content| content.exam.status == ExamStatus::Published)
            .ok_or(AttemptError::NotFound("Exam not found"))?;

        if self.store.find_in_progress(exam_id, student_id).await?.is_some() {
            tracing::debug!(exam_id, student_id, "Attempt already in progress");
            return Err(AttemptError::Conflict("An attempt is already in progress"));
        }

        let now = self.clock.now();
        let attempt_id = Uuid::new_v4().to_string();
        let snapshot: Vec<SnapshotQuestion> =
            content.questions.iter().map(Question::snapshot).collect();
        let price = content.exam.price_cents;

        let payment = if price > 0 {
            let receipt = self
                .payments
                .debit(student_id, price, &attempt_debit_reference(&attempt_id))
                .await
                .map_err(|err| {
                    tracing::info!(exam_id, student_id, error = %err, "Attempt payment declined");
                    err
                })?;
            Some(receipt.transaction_id)
        } else {
            None
        };

        let attempt = Attempt {
            id: attempt_id,
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            status: AttemptStatus::InProgress,
            started_at: now,
            expires_at: deadline::compute_expiration(now, content.exam.duration_minutes),
            submitted_at: None,
            score: None,
            total_score: scoring::total_points(&snapshot),
            grading_status: GradingStatus::Ungraded,
            answers_revision: 0,
            question_snapshot: Json(snapshot),
            payment_transaction_id: payment,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_attempt(&attempt).await {
            Ok(true) => {
                tracing::info!(
                    attempt_id = %attempt.id,
                    exam_id,
                    student_id,
                    expires_at = %attempt.expires_at,
                    "Attempt started"
                );
                metrics::counter!("attempts_started_total").increment(1);
                Ok(attempt)
            }
            Ok(false) => {
                tracing::debug!(exam_id, student_id, "Attempt lost the start race");
                self.refund_start(&attempt, price).await;
                Err(AttemptError::Conflict("An attempt is already in progress"))
            }
            Err(err) => {
                self.refund_start(&attempt, price).await;
                Err(err.into())
            }
        }
    }

    async fn refund_start(&self, attempt: &Attempt, price: i64) {
        if attempt.payment_transaction_id.is_none() {
            return;
        }

        let reference = attempt_refund_reference(&attempt.id);
        match self.payments.refund(&attempt.student_id, price, &reference).await {
            Ok(_) => tracing::info!(
                attempt_id = %attempt.id,
                student_id = %attempt.student_id,
                amount_cents = price,
                "Refunded attempt that was never created"
            ),
            Err(err) => {
                metrics::counter!("attempt_refunds_failed_total").increment(1);
                tracing::error!(
                    attempt_id = %attempt.id,
                    student_id = %attempt.student_id,
                    reference,
                    error = %err,
                    "Failed to refund attempt that was never created"
                );
            }
        }
    }

    pub(crate) async fn submit_answers(
        &self,
        attempt_id: &str,
        student_id: &str,
        answers: Vec<NewAnswer>,
    ) -> Result<SavedAnswers, AttemptError> {
        let attempt = self.owned_attempt(attempt_id, student_id).await?;
        self.ensure_open(&attempt).await?;

        let answers = self.prepare_answers(&attempt.question_snapshot.0, answers)?;
        let now = self.clock.now();

        match self.store.save_answers(attempt_id, &answers, now).await? {
            AnswerWrite::Saved { revision } => {
                metrics::counter!("answers_upserted_total").increment(answers.len() as u64);
                tracing::debug!(attempt_id, saved = answers.len(), revision, "Answers saved");
                Ok(SavedAnswers { saved: answers.len(), revision })
            }
            AnswerWrite::Closed => {
                self.time_out(attempt_id).await?;
                tracing::info!(attempt_id, student_id, "Answers rejected after attempt closed");
                Err(AttemptError::Expired)
            }
        }
    }

    /// Deduplicates by question (last one wins) and checks every answer against
    /// the attempt's question snapshot.
    fn prepare_answers(
        &self,
        snapshot: &[SnapshotQuestion],
        answers: Vec<NewAnswer>,
    ) -> Result<Vec<NewAnswer>, AttemptError> {
        if answers.is_empty() {
            return Err(AttemptError::validation("at least one answer is required"));
        }
        if answers.len() > self.settings.max_answers_per_request {
            return Err(AttemptError::validation(format!(
                "at most {} answers per request",
                self.settings.max_answers_per_request
            )));
        }

        let questions: HashMap<&str, &SnapshotQuestion> =
            snapshot.iter().map(|question| (question.question_id.as_str(), question)).collect();

        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<NewAnswer> = Vec::with_capacity(answers.len());
        for answer in answers {
            match positions.get(&answer.question_id) {
                Some(&index) => unique[index] = answer,
                None => {
                    positions.insert(answer.question_id.clone(), unique.len());
                    unique.push(answer);
                }
            }
        }

        for answer in &unique {
            let question = questions.get(answer.question_id.as_str()).ok_or_else(|| {
                AttemptError::validation(format!("unknown question {}", answer.question_id))
            })?;
            check_shape(question, answer)?;
        }

        Ok(unique)
    }

    pub(crate) async fn finalize_attempt(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<AttemptResult, AttemptError> {
        for _ in 0..=self.settings.finalize_max_retries {
            let attempt = self.owned_attempt(attempt_id, student_id).await?;
            match attempt.status {
                AttemptStatus::Completed => {
                    let answers = self.store.list_answers(attempt_id).await?;
                    return Ok(AttemptResult { attempt, answers });
                }
                AttemptStatus::TimedOut => {
                    tracing::info!(attempt_id, student_id, "Finalize after timeout");
                    return Err(AttemptError::Expired);
                }
                AttemptStatus::InProgress => {}
            }

            let now = self.clock.now();
            if deadline::is_expired(attempt.expires_at, now) {
                self.time_out(attempt_id).await?;
                tracing::info!(attempt_id, student_id, "Finalize after deadline");
                return Err(AttemptError::Expired);
            }

            let answers = self.store.list_answers(attempt_id).await?;
            let sheet = scoring::score_attempt(&attempt.question_snapshot.0, &answers);
            let request = CloseRequest {
                attempt_id: attempt.id.clone(),
                expected_revision: attempt.answers_revision,
                status: AttemptStatus::Completed,
                submitted_at: now,
                score: sheet.score,
                grading_status: sheet.grading_status,
                answers: sheet.answers,
                now,
            };

            if self.store.close_attempt(&request).await? {
                tracing::info!(
                    attempt_id,
                    exam_id = %attempt.exam_id,
                    student_id,
                    score = sheet.score,
                    total_score = sheet.total_score,
                    status = "completed",
                    "Attempt finalized"
                );
                metrics::counter!("attempts_finalized_total").increment(1);

                let attempt = self
                    .store
                    .find_attempt(attempt_id)
                    .await?
                    .ok_or(AttemptError::NotFound("Attempt not found"))?;
                let answers = self.store.list_answers(attempt_id).await?;
                return Ok(AttemptResult { attempt, answers });
            }

            tracing::debug!(attempt_id, "Finalize lost a race, retrying");
        }

        Err(AttemptError::Conflict("Attempt kept changing while finalizing"))
    }

    /// Heartbeat: the student's view of an attempt. Times it out if the
    /// deadline has passed since the last request.
    pub(crate) async fn get_attempt(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<AttemptView, AttemptError> {
        let mut attempt = self.owned_attempt(attempt_id, student_id).await?;
        let now = self.clock.now();

        if attempt.status == AttemptStatus::InProgress
            && deadline::is_expired(attempt.expires_at, now)
        {
            self.time_out(attempt_id).await?;
            attempt = self.owned_attempt(attempt_id, student_id).await?;
        }

        let content = self
            .store
            .load_exam_content(&attempt.exam_id)
            .await?
            .ok_or(AttemptError::NotFound("Exam not found"))?;

        let order: HashMap<&str, usize> = attempt
            .question_snapshot
            .0
            .iter()
            .enumerate()
            .map(|(index, question)| (question.question_id.as_str(), index))
            .collect();
        let mut questions: Vec<Question> = content
            .questions
            .into_iter()
            .filter(|question| order.contains_key(question.id.as_str()))
            .collect();
        questions.sort_by_key(|question| order.get(question.id.as_str()).copied());

        let answers = self.store.list_answers(attempt_id).await?;
        let remaining_seconds = match attempt.status {
            AttemptStatus::InProgress => deadline::remaining_seconds(attempt.expires_at, now),
            AttemptStatus::Completed | AttemptStatus::TimedOut => 0,
        };

        Ok(AttemptView {
            attempt,
            exam: content.exam,
            reading_texts: content.reading_texts,
            questions,
            answers,
            remaining_seconds,
        })
    }

    /// Closes every attempt past its deadline, batch by batch.
    pub(crate) async fn run_expiry_sweep(&self) -> Result<SweepReport, AttemptError> {
        let batch_size = self.settings.sweep_batch_size.max(1);
        let mut report = SweepReport::default();

        loop {
            let now = self.clock.now();
            let ids = self.store.list_expired(now, batch_size).await?;
            report.scanned += ids.len();

            let mut processed_in_batch = 0;
            for attempt_id in &ids {
                match self.time_out(attempt_id).await {
                    Ok(true) => processed_in_batch += 1,
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(attempt_id = %attempt_id, error = %err, "Failed to time out attempt");
                    }
                }
            }
            report.processed += processed_in_batch;

            if ids.len() < batch_size as usize || processed_in_batch == 0 {
                break;
            }
        }

        if report.processed > 0 {
            tracing::info!(
                scanned = report.scanned,
                processed = report.processed,
                "Expiry sweep closed attempts"
            );
        }
        Ok(report)
    }

    /// Moves an expired in-progress attempt to TIMED_OUT. Returns `false` when
    /// there was nothing to do (already closed, or not yet expired).
    pub(super) async fn time_out(&self, attempt_id: &str) -> Result<bool, AttemptError> {
        for _ in 0..=self.settings.finalize_max_retries {
            let attempt = self
                .store
                .find_attempt(attempt_id)
                .await?
                .ok_or(AttemptError::NotFound("Attempt not found"))?;

            if attempt.status != AttemptStatus::InProgress {
                return Ok(false);
            }
            let now = self.clock.now();
            if !deadline::is_expired(attempt.expires_at, now) {
                return Ok(false);
            }

            let answers = self.store.list_answers(attempt_id).await?;
            let sheet = scoring::score_attempt(&attempt.question_snapshot.0, &answers);
            let request = CloseRequest {
                attempt_id: attempt.id.clone(),
                expected_revision: attempt.answers_revision,
                status: AttemptStatus::TimedOut,
                submitted_at: attempt.expires_at,
                score: sheet.score,
                grading_status: sheet.grading_status,
                answers: sheet.answers,
                now,
            };

            if self.store.close_attempt(&request).await? {
                tracing::info!(
                    attempt_id,
                    exam_id = %attempt.exam_id,
                    student_id = %attempt.student_id,
                    score = sheet.score,
                    status = "timed_out",
                    "Attempt timed out"
                );
                metrics::counter!("attempts_timed_out_total").increment(1);
                return Ok(true);
            }
        }

        Err(AttemptError::Conflict("Attempt kept changing while timing out"))
    }

    async fn owned_attempt(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<Attempt, AttemptError> {
        let attempt = self
            .store
            .find_attempt(attempt_id)
            .await?
            .ok_or(AttemptError::NotFound("Attempt not found"))?;
        if attempt.student_id != student_id {
            return Err(AttemptError::Forbidden("Attempt belongs to another student"));
        }
        Ok(attempt)
    }

    async fn ensure_open(&self, attempt: &Attempt) -> Result<(), AttemptError> {
        match attempt.status {
            AttemptStatus::Completed | AttemptStatus::TimedOut => Err(AttemptError::Expired),
            AttemptStatus::InProgress => {
                if deadline::is_expired(attempt.expires_at, self.clock.now()) {
                    self.time_out(&attempt.id).await?;
                    tracing::info!(attempt_id = %attempt.id, "Answers rejected after deadline");
                    return Err(AttemptError::Expired);
                }
                Ok(())
            }
        }
    }
}

fn check_shape(question: &SnapshotQuestion, answer: &NewAnswer) -> Result<(), AttemptError> {
    match question.grading_mode() {
        GradingMode::Auto => match (&answer.selected_option_id, &answer.content) {
            (Some(option_id), None) if question.option_ids.iter().any(|id| id == option_id) => {
                Ok(())
            }
            (Some(option_id), None) => Err(AttemptError::validation(format!(
                "option {option_id} does not belong to question {}",
                question.question_id
            ))),
            _ => Err(AttemptError::validation(format!(
                "question {} expects exactly one selected option",
                question.question_id
            ))),
        },
        GradingMode::Manual => match (&answer.selected_option_id, &answer.content) {
            (None, Some(content)) if content.chars().count() > MAX_ANSWER_CHARS => {
                Err(AttemptError::validation(format!(
                    "answer to question {} is longer than {MAX_ANSWER_CHARS} characters",
                    question.question_id
                )))
            }
            (None, Some(_)) => Ok(()),
            _ => Err(AttemptError::validation(format!(
                "question {} expects a text answer",
                question.question_id
            ))),
        },
    }
}
