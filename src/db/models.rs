use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AttemptStatus, ExamStatus, GradeState, GradingMode, GradingStatus, QuestionType,
    WalletTransactionKind,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) owner_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: ExamStatus,
    pub(crate) duration_minutes: i32,
    pub(crate) price_cents: i64,
    pub(crate) prize_pool_cents: i64,
    pub(crate) prize_shares_bps: Json<Vec<u32>>,
    pub(crate) rank_timed_out: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) published_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ReadingText {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) order_index: i32,
    pub(crate) title: String,
    pub(crate) body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) order_index: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    pub(crate) options: Json<Vec<QuestionOption>>,
    pub(crate) correct_option_id: Option<String>,
    pub(crate) model_answer: Option<String>,
    pub(crate) reading_text_id: Option<String>,
}

impl Question {
    pub(crate) fn snapshot(&self) -> SnapshotQuestion {
        SnapshotQuestion {
            question_id: self.id.clone(),
            question_type: self.question_type,
            points: self.points,
            option_ids: self.options.0.iter().map(|option| option.id.clone()).collect(),
            correct_option_id: self.correct_option_id.clone(),
        }
    }
}

/// The slice of a question an attempt keeps from the moment it started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SnapshotQuestion {
    pub(crate) question_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: f64,
    pub(crate) option_ids: Vec<String>,
    pub(crate) correct_option_id: Option<String>,
}

impl SnapshotQuestion {
    pub(crate) fn grading_mode(&self) -> GradingMode {
        self.question_type.grading_mode(self.correct_option_id.is_some())
    }
}

/// An exam together with its ordered content.
#[derive(Debug, Clone)]
pub(crate) struct ExamContent {
    pub(crate) exam: Exam,
    pub(crate) reading_texts: Vec<ReadingText>,
    pub(crate) questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) score: Option<f64>,
    pub(crate) total_score: f64,
    pub(crate) grading_status: GradingStatus,
    pub(crate) answers_revision: i64,
    pub(crate) question_snapshot: Json<Vec<SnapshotQuestion>>,
    pub(crate) payment_transaction_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) grade_state: GradeState,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct WalletTransaction {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) kind: WalletTransactionKind,
    pub(crate) amount_cents: i64,
    pub(crate) reference: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct PrizeAward {
    pub(crate) exam_id: String,
    pub(crate) position: i32,
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) transaction_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) paid_at: Option<PrimitiveDateTime>,
}
