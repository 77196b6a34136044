use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Answer, Attempt};
use crate::db::types::{AttemptStatus, GradeState, GradingStatus};
use crate::schemas::exam::{QuestionResponse, ReadingTextResponse};
use crate::services::exams::{
    AttemptResult, AttemptView, NewAnswer, SavedAnswers, SweepReport, UpdatedScore,
};

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) expires_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) total_score: f64,
    pub(crate) grading_status: GradingStatus,
    pub(crate) answers_revision: i64,
}

impl From<Attempt> for AttemptResponse {
    fn from(attempt: Attempt) -> Self {
        AttemptResponse {
            id: attempt.id,
            exam_id: attempt.exam_id,
            student_id: attempt.student_id,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            expires_at: format_primitive(attempt.expires_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            score: attempt.score,
            total_score: attempt.total_score,
            grading_status: attempt.grading_status,
            answers_revision: attempt.answers_revision,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) grade_state: GradeState,
    pub(crate) graded_at: Option<String>,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        AnswerResponse {
            id: answer.id,
            question_id: answer.question_id,
            selected_option_id: answer.selected_option_id,
            content: answer.content,
            is_correct: answer.is_correct,
            points_awarded: answer.points_awarded,
            grade_state: answer.grade_state,
            graded_at: answer.graded_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptViewResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) exam_title: String,
    pub(crate) remaining_seconds: i64,
    pub(crate) reading_texts: Vec<ReadingTextResponse>,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) answers: Vec<AnswerResponse>,
}

impl From<AttemptView> for AttemptViewResponse {
    fn from(view: AttemptView) -> Self {
        AttemptViewResponse {
            attempt: view.attempt.into(),
            exam_title: view.exam.title,
            remaining_seconds: view.remaining_seconds,
            reading_texts: view.reading_texts.into_iter().map(Into::into).collect(),
            questions: view
                .questions
                .into_iter()
                .map(|question| QuestionResponse::from_model(question, false))
                .collect(),
            answers: view.answers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) answers: Vec<AnswerResponse>,
}

impl From<AttemptResult> for AttemptResultResponse {
    fn from(result: AttemptResult) -> Self {
        AttemptResultResponse {
            attempt: result.attempt.into(),
            answers: result.answers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerInput {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "selectedOptionId")]
    pub(crate) selected_option_id: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswersRequest {
    #[validate(nested)]
    pub(crate) answers: Vec<AnswerInput>,
}

impl SubmitAnswersRequest {
    pub(crate) fn into_answers(self) -> Vec<NewAnswer> {
        self.answers
            .into_iter()
            .map(|answer| NewAnswer {
                question_id: answer.question_id,
                selected_option_id: answer.selected_option_id,
                content: answer.content,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SavedAnswersResponse {
    pub(crate) saved: usize,
    pub(crate) revision: i64,
}

impl From<SavedAnswers> for SavedAnswersResponse {
    fn from(saved: SavedAnswers) -> Self {
        SavedAnswersResponse { saved: saved.saved, revision: saved.revision }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeAnswerRequest {
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdatedScoreResponse {
    pub(crate) attempt_id: String,
    pub(crate) answer_id: String,
    pub(crate) points_awarded: f64,
    pub(crate) score: f64,
    pub(crate) total_score: f64,
    pub(crate) grading_status: GradingStatus,
}

impl From<UpdatedScore> for UpdatedScoreResponse {
    fn from(updated: UpdatedScore) -> Self {
        UpdatedScoreResponse {
            attempt_id: updated.attempt_id,
            answer_id: updated.answer_id,
            points_awarded: updated.points_awarded,
            score: updated.score,
            total_score: updated.total_score,
            grading_status: updated.grading_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SweepResponse {
    pub(crate) scanned: usize,
    pub(crate) processed: usize,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        SweepResponse { scanned: report.scanned, processed: report.processed }
    }
}
