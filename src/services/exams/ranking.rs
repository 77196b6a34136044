use crate::db::models::PrizeAward;
use crate::db::types::{ExamStatus, GradingStatus};
use crate::services::leaderboard::{self, LeaderboardData};
use crate::services::payments::prize_reference;

use super::{Actor, AttemptError, ExamService, PrizePayout};

impl ExamService {
    pub(crate) async fn leaderboard(
        &self,
        exam_id: &str,
        requesting_student: Option<&str>,
    ) -> Result<LeaderboardData, AttemptError> {
        let exam = self
            .store
            .find_exam(exam_id)
            .await?
            .filter(|exam| exam.status != ExamStatus::Draft)
            .ok_or(AttemptError::NotFound("Exam not found"))?;

        let attempts = self.store.list_finished(exam_id, exam.rank_timed_out).await?;
        Ok(leaderboard::build(&exam, &attempts, requesting_student))
    }

    /// Freezes the ranking of an archived exam into prize awards and credits the
    /// unpaid ones. Freezing waits until no attempt is open and every ranked
    /// attempt is fully graded. Safe to call again after a partial failure.
    pub(crate) async fn award_prizes(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> Result<PrizePayout, AttemptError> {
        let exam = self.managed_exam(actor, exam_id).await?;
        if exam.status != ExamStatus::Archived {
            return Err(AttemptError::validation("prizes are awarded once the exam is archived"));
        }

        let mut awards = self.store.list_prize_awards(exam_id).await?;
        if awards.is_empty() {
            if self.store.count_in_progress(exam_id).await? > 0 {
                return Err(AttemptError::Conflict("attempts of this exam are still in progress"));
            }
            let attempts = self.store.list_finished(exam_id, exam.rank_timed_out).await?;
            if attempts.iter().any(|attempt| attempt.grading_status != GradingStatus::Complete) {
                return Err(AttemptError::Conflict("answers are still awaiting manual grading"));
            }
            let board = leaderboard::build(&exam, &attempts, None);
            let now = self.clock.now();
            let computed: Vec<PrizeAward> = board
                .entries
                .iter()
                .filter(|entry| entry.prize_cents > 0)
                .map(|entry| PrizeAward {
                    exam_id: exam_id.to_string(),
                    position: entry.position as i32,
                    attempt_id: entry.attempt_id.clone(),
                    student_id: entry.student_id.clone(),
                    amount_cents: entry.prize_cents,
                    transaction_id: None,
                    created_at: now,
                    paid_at: None,
                })
                .collect();

            if computed.is_empty() {
                return Ok(PrizePayout { awards: Vec::new(), credited: 0 });
            }
            awards = self.store.freeze_prize_awards(exam_id, &computed).await?;
        }

        let mut credited = 0;
        for award in awards.iter().filter(|award| award.paid_at.is_none()) {
            let reference = prize_reference(exam_id, award.position);
            let receipt = self
                .payments
                .credit_prize(&award.student_id, award.amount_cents, &reference)
                .await?;

            if self
                .store
                .mark_prize_paid(exam_id, award.position, &receipt.transaction_id, self.clock.now())
                .await?
            {
                credited += 1;
                tracing::info!(
                    exam_id,
                    position = award.position,
                    student_id = %award.student_id,
                    amount_cents = award.amount_cents,
                    "Prize credited"
                );
            }
        }

        metrics::counter!("prizes_credited_total").increment(credited as u64);
        let awards = self.store.list_prize_awards(exam_id).await?;
        Ok(PrizePayout { awards, credited })
    }
}
