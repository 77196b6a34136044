mod authoring;
mod errors;
mod grading;
mod lifecycle;
mod pg_store;
mod ranking;
mod store;


use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::AttemptSettings;
use crate::core::time::{Clock, SystemClock};
use crate::db::models::{Answer, Attempt, Exam, PrizeAward, Question, ReadingText};
use crate::db::types::{GradingStatus, UserRole};
use crate::services::payments::{LedgerPayments, PaymentGateway};

pub(crate) use authoring::{ExamDraft, QuestionDraft, ReadingTextDraft};
pub(crate) use errors::{AttemptError, StoreError};
pub(crate) use pg_store::PgAttemptStore;
pub(crate) use store::{AnswerWrite, AttemptStore, CloseRequest, GradeRequest, NewAnswer};

/// Authenticated caller as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Actor {
    pub(crate) user_id: String,
    pub(crate) role: UserRole,
}

impl Actor {
    pub(crate) fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self { user_id: user_id.into(), role }
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Exam owners and admins.
    pub(crate) fn manages(&self, exam: &Exam) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Teacher => exam.owner_id == self.user_id,
            UserRole::Student => false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AttemptResult {
    pub(crate) attempt: Attempt,
    pub(crate) answers: Vec<Answer>,
}

/// What a student sees while working on an attempt.
#[derive(Debug, Clone)]
pub(crate) struct AttemptView {
    pub(crate) attempt: Attempt,
    pub(crate) exam: Exam,
    pub(crate) reading_texts: Vec<ReadingText>,
    pub(crate) questions: Vec<Question>,
    pub(crate) answers: Vec<Answer>,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SavedAnswers {
    pub(crate) saved: usize,
    pub(crate) revision: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UpdatedScore {
    pub(crate) attempt_id: String,
    pub(crate) answer_id: String,
    pub(crate) points_awarded: f64,
    pub(crate) score: f64,
    pub(crate) total_score: f64,
    pub(crate) grading_status: GradingStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) scanned: usize,
    pub(crate) processed: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct PrizePayout {
    pub(crate) awards: Vec<PrizeAward>,
    pub(crate) credited: usize,
}

/// Entry point of the exam core: authoring, attempts, grading and ranking.
#[derive(Clone)]
pub(crate) struct ExamService {
    store: Arc<dyn AttemptStore>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    settings: AttemptSettings,
}

impl ExamService {
    pub(crate) fn new(
        store: Arc<dyn AttemptStore>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        settings: AttemptSettings,
    ) -> Self {
        Self { store, payments, clock, settings }
    }

    pub(crate) fn postgres(pool: PgPool, settings: AttemptSettings) -> Self {
        Self::new(
            Arc::new(PgAttemptStore::new(pool.clone())),
            Arc::new(LedgerPayments::new(pool)),
            Arc::new(SystemClock),
            settings,
        )
    }

    pub(crate) fn payments(&self) -> &dyn PaymentGateway {
        self.payments.as_ref()
    }
}
