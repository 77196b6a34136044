use crate::db::types::UserRole;
use crate::services::scoring;

use super::{Actor, AttemptError, ExamService, GradeRequest, UpdatedScore};

impl ExamService {
    /// Manual grade on a finished attempt; the only change allowed after close.
    pub(crate) async fn grade_answer(
        &self,
        actor: &Actor,
        attempt_id: &str,
        answer_id: &str,
        points: f64,
    ) -> Result<UpdatedScore, AttemptError> {
        if actor.role == UserRole::Student {
            return Err(AttemptError::Forbidden("Only teachers can grade answers"));
        }

        let attempt = self
            .store
            .find_attempt(attempt_id)
            .await?
            .ok_or(AttemptError::NotFound("Attempt not found"))?;
        self.managed_exam(actor, &attempt.exam_id).await?;

        if !attempt.status.is_terminal() {
            return Err(AttemptError::validation("attempt is still in progress"));
        }
        if !self.store.list_prize_awards(&attempt.exam_id).await?.is_empty() {
            return Err(AttemptError::Conflict("prizes for this exam are already frozen"));
        }

        let answers = self.store.list_answers(attempt_id).await?;
        let answer = answers
            .iter()
            .find(|answer| answer.id == answer_id)
            .ok_or(AttemptError::NotFound("Answer not found"))?;
        let question = attempt
            .question_snapshot
            .0
            .iter()
            .find(|question| question.question_id == answer.question_id)
            .ok_or_else(|| AttemptError::validation("answer does not match the exam questions"))?;

        let is_correct = scoring::check_manual_grade(question, points)
            .map_err(|err| AttemptError::validation(err.to_string()))?;

        let request = GradeRequest {
            attempt_id: attempt_id.to_string(),
            answer_id: answer_id.to_string(),
            points,
            is_correct,
            graded_by: actor.user_id.clone(),
            now: self.clock.now(),
        };
        let updated = self
            .store
            .apply_manual_grade(&request)
            .await?
            .ok_or_else(|| AttemptError::validation("answer cannot be graded manually"))?;

        tracing::info!(
            attempt_id,
            answer_id,
            grader_id = %actor.user_id,
            points,
            score = updated.score.unwrap_or(0.0),
            grading_status = ?updated.grading_status,
            "Answer graded"
        );
        metrics::counter!("manual_grades_total").increment(1);

        Ok(UpdatedScore {
            attempt_id: updated.id,
            answer_id: answer_id.to_string(),
            points_awarded: points,
            score: updated.score.unwrap_or(0.0),
            total_score: updated.total_score,
            grading_status: updated.grading_status,
        })
    }
}
