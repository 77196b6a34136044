use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Exam, ExamContent, Question, ReadingText};
use crate::db::types::{ExamStatus, QuestionType};
use crate::services::exams::{ExamDraft, QuestionDraft, ReadingTextDraft};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct ReadingTextCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[validate(length(min = 1, message = "body must not be empty"))]
    pub(crate) body: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionType", alias = "type")]
    pub(crate) question_type: QuestionType,
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub(crate) prompt: String,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default)]
    #[serde(alias = "correctOption")]
    pub(crate) correct_option: Option<usize>,
    #[serde(default)]
    #[serde(alias = "modelAnswer")]
    pub(crate) model_answer: Option<String>,
    #[serde(default)]
    #[serde(alias = "readingText")]
    pub(crate) reading_text: Option<usize>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, max = 1440, message = "duration_minutes must be 1-1440"))]
    pub(crate) duration_minutes: i32,
    #[serde(default)]
    #[serde(alias = "priceCents")]
    #[validate(range(min = 0, message = "price_cents must be non-negative"))]
    pub(crate) price_cents: i64,
    #[serde(default)]
    #[serde(alias = "prizePoolCents")]
    #[validate(range(min = 0, message = "prize_pool_cents must be non-negative"))]
    pub(crate) prize_pool_cents: i64,
    #[serde(default)]
    #[serde(alias = "prizeSharesBps")]
    pub(crate) prize_shares_bps: Vec<u32>,
    #[serde(default = "default_rank_timed_out")]
    #[serde(alias = "rankTimedOut")]
    pub(crate) rank_timed_out: bool,
    #[serde(default)]
    #[serde(alias = "readingTexts")]
    #[validate(nested)]
    pub(crate) reading_texts: Vec<ReadingTextCreate>,
    #[validate(length(min = 1, message = "at least one question is required"), nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

fn default_rank_timed_out() -> bool {
    true
}

impl From<ExamCreate> for ExamDraft {
    fn from(payload: ExamCreate) -> Self {
        ExamDraft {
            title: payload.title,
            description: payload.description,
            duration_minutes: payload.duration_minutes,
            price_cents: payload.price_cents,
            prize_pool_cents: payload.prize_pool_cents,
            prize_shares_bps: payload.prize_shares_bps,
            rank_timed_out: payload.rank_timed_out,
            reading_texts: payload
                .reading_texts
                .into_iter()
                .map(|text| ReadingTextDraft { title: text.title, body: text.body })
                .collect(),
            questions: payload
                .questions
                .into_iter()
                .map(|question| QuestionDraft {
                    question_type: question.question_type,
                    prompt: question.prompt,
                    points: question.points,
                    options: question.options,
                    correct_option: question.correct_option,
                    model_answer: question.model_answer,
                    reading_text: question.reading_text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) owner_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: ExamStatus,
    pub(crate) duration_minutes: i32,
    pub(crate) price_cents: i64,
    pub(crate) prize_pool_cents: i64,
    pub(crate) prize_shares_bps: Vec<u32>,
    pub(crate) rank_timed_out: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) published_at: Option<String>,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        ExamResponse {
            id: exam.id,
            owner_id: exam.owner_id,
            title: exam.title,
            description: exam.description,
            status: exam.status,
            duration_minutes: exam.duration_minutes,
            price_cents: exam.price_cents,
            prize_pool_cents: exam.prize_pool_cents,
            prize_shares_bps: exam.prize_shares_bps.0,
            rank_timed_out: exam.rank_timed_out,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            published_at: exam.published_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReadingTextResponse {
    pub(crate) id: String,
    pub(crate) order_index: i32,
    pub(crate) title: String,
    pub(crate) body: String,
}

impl From<ReadingText> for ReadingTextResponse {
    fn from(text: ReadingText) -> Self {
        ReadingTextResponse {
            id: text.id,
            order_index: text.order_index,
            title: text.title,
            body: text.body,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) id: String,
    pub(crate) text: String,
}

/// Answer keys are only filled in for the people managing the exam.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) order_index: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    pub(crate) options: Vec<OptionResponse>,
    pub(crate) reading_text_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_option_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) model_answer: Option<String>,
}

impl QuestionResponse {
    pub(crate) fn from_model(question: Question, reveal_keys: bool) -> Self {
        QuestionResponse {
            id: question.id,
            order_index: question.order_index,
            question_type: question.question_type,
            prompt: question.prompt,
            points: question.points,
            options: question
                .options
                .0
                .into_iter()
                .map(|option| OptionResponse { id: option.id, text: option.text })
                .collect(),
            reading_text_id: question.reading_text_id,
            correct_option_id: question.correct_option_id.filter(|_| reveal_keys),
            model_answer: question.model_answer.filter(|_| reveal_keys),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) reading_texts: Vec<ReadingTextResponse>,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl ExamDetailResponse {
    pub(crate) fn from_content(content: ExamContent, reveal_keys: bool) -> Self {
        ExamDetailResponse {
            exam: content.exam.into(),
            reading_texts: content.reading_texts.into_iter().map(Into::into).collect(),
            questions: content
                .questions
                .into_iter()
                .map(|question| QuestionResponse::from_model(question, reveal_keys))
                .collect(),
        }
    }
}
