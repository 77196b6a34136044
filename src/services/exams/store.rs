use async_trait::async_trait;
use time::PrimitiveDateTime;

use crate::db::models::{Answer, Attempt, Exam, ExamContent, PrizeAward};
use crate::db::types::{AttemptStatus, ExamStatus, GradingStatus};
use crate::services::exams::errors::StoreError;
use crate::services::scoring::ScoredAnswer;

/// One answer as submitted by a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnswerWrite {
    Saved { revision: i64 },
    /// The attempt was closed or reached its deadline before the write.
    Closed,
}

/// Terminal transition guarded by status, deadline and answers revision.
#[derive(Debug, Clone)]
pub(crate) struct CloseRequest {
    pub(crate) attempt_id: String,
    pub(crate) expected_revision: i64,
    pub(crate) status: AttemptStatus,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) score: f64,
    pub(crate) grading_status: GradingStatus,
    pub(crate) answers: Vec<ScoredAnswer>,
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct GradeRequest {
    pub(crate) attempt_id: String,
    pub(crate) answer_id: String,
    pub(crate) points: f64,
    pub(crate) is_correct: bool,
    pub(crate) graded_by: String,
    pub(crate) now: PrimitiveDateTime,
}

/// Persistence port of the exam core. Implementations must make
/// `insert_attempt`, `save_answers`, `close_attempt` and `apply_manual_grade`
/// atomic with respect to each other.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    async fn create_exam(&self, content: &ExamContent) -> Result<(), StoreError>;

    async fn find_exam(&self, exam_id: &str) -> Result<Option<Exam>, StoreError>;

    async fn load_exam_content(&self, exam_id: &str) -> Result<Option<ExamContent>, StoreError>;

    async fn transition_exam(
        &self,
        exam_id: &str,
        from: ExamStatus,
        to: ExamStatus,
        now: PrimitiveDateTime,
    ) -> Result<bool, StoreError>;

    async fn find_in_progress(
        &self,
        exam_id: &str,
        student_id: &str,
    ) -> Result<Option<Attempt>, StoreError>;

    /// `false` when an in-progress attempt already exists for the pair.
    async fn insert_attempt(&self, attempt: &Attempt) -> Result<bool, StoreError>;

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>, StoreError>;

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<Answer>, StoreError>;

    async fn save_answers(
        &self,
        attempt_id: &str,
        answers: &[NewAnswer],
        now: PrimitiveDateTime,
    ) -> Result<AnswerWrite, StoreError>;

    /// `false` when the guard did not match; nothing is written in that case.
    async fn close_attempt(&self, request: &CloseRequest) -> Result<bool, StoreError>;

    async fn list_expired(
        &self,
        now: PrimitiveDateTime,
        limit: u32,
    ) -> Result<Vec<String>, StoreError>;

    async fn list_finished(
        &self,
        exam_id: &str,
        include_timed_out: bool,
    ) -> Result<Vec<Attempt>, StoreError>;

    async fn count_in_progress(&self, exam_id: &str) -> Result<i64, StoreError>;

    /// Returns the attempt with its refreshed score, or `None` when the answer
    /// cannot take a manual grade.
    async fn apply_manual_grade(
        &self,
        request: &GradeRequest,
    ) -> Result<Option<Attempt>, StoreError>;

    async fn list_prize_awards(&self, exam_id: &str) -> Result<Vec<PrizeAward>, StoreError>;

    /// Keeps already frozen rows and returns the resulting table.
    async fn freeze_prize_awards(
        &self,
        exam_id: &str,
        awards: &[PrizeAward],
    ) -> Result<Vec<PrizeAward>, StoreError>;

    async fn mark_prize_paid(
        &self,
        exam_id: &str,
        position: i32,
        transaction_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<bool, StoreError>;
}
