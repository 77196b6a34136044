use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Teacher,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "examstatus", rename_all = "lowercase")]
pub(crate) enum ExamStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    MultipleChoice,
    OpenEnded,
    ReadingComprehension,
}

/// How a question's answer receives its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradingMode {
    Auto,
    Manual,
}

impl QuestionType {
    /// Reading comprehension is auto-graded only when it is posed as a choice question.
    pub(crate) fn grading_mode(self, has_correct_option: bool) -> GradingMode {
        match self {
            QuestionType::MultipleChoice => GradingMode::Auto,
            QuestionType::OpenEnded => GradingMode::Manual,
            QuestionType::ReadingComprehension if has_correct_option => GradingMode::Auto,
            QuestionType::ReadingComprehension => GradingMode::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Completed,
    TimedOut,
}

impl AttemptStatus {
    pub(crate) fn is_terminal(self) -> bool {
        match self {
            AttemptStatus::InProgress => false,
            AttemptStatus::Completed | AttemptStatus::TimedOut => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "gradingstatus", rename_all = "snake_case")]
pub(crate) enum GradingStatus {
    Ungraded,
    AwaitingManual,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "gradestate", rename_all = "snake_case")]
pub(crate) enum GradeState {
    Ungraded,
    Auto,
    PendingManual,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "wallettransactionkind", rename_all = "lowercase")]
pub(crate) enum WalletTransactionKind {
    Deposit,
    Debit,
    Refund,
    Prize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_comprehension_grading_follows_answer_key() {
        assert_eq!(QuestionType::ReadingComprehension.grading_mode(true), GradingMode::Auto);
        assert_eq!(QuestionType::ReadingComprehension.grading_mode(false), GradingMode::Manual);
        assert_eq!(QuestionType::OpenEnded.grading_mode(true), GradingMode::Manual);
        assert_eq!(QuestionType::MultipleChoice.grading_mode(false), GradingMode::Auto);
    }

    #[test]
    fn attempt_status_serializes_snake_case() {
        let value = serde_json::to_value(AttemptStatus::TimedOut).unwrap();
        assert_eq!(value, "timed_out");
        assert!(AttemptStatus::TimedOut.is_terminal());
        assert!(!AttemptStatus::InProgress.is_terminal());
    }
}
