use sqlx::types::Json;
use uuid::Uuid;

use crate::db::models::{Exam, ExamContent, Question, QuestionOption, ReadingText};
use crate::db::types::{ExamStatus, QuestionType, UserRole};

use super::{Actor, AttemptError, ExamService};

const MAX_SHARES_BPS: u32 = 10_000;

#[derive(Debug, Clone)]
pub(crate) struct ExamDraft {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) price_cents: i64,
    pub(crate) prize_pool_cents: i64,
    pub(crate) prize_shares_bps: Vec<u32>,
    pub(crate) rank_timed_out: bool,
    pub(crate) reading_texts: Vec<ReadingTextDraft>,
    pub(crate) questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone)]
pub(crate) struct ReadingTextDraft {
    pub(crate) title: String,
    pub(crate) body: String,
}

/// Options are given as texts; `correct_option` and `reading_text` are indexes
/// into the draft's own lists.
#[derive(Debug, Clone)]
pub(crate) struct QuestionDraft {
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option: Option<usize>,
    pub(crate) model_answer: Option<String>,
    pub(crate) reading_text: Option<usize>,
}

impl ExamService {
    pub(crate) async fn create_exam(
        &self,
        actor: &Actor,
        draft: ExamDraft,
    ) -> Result<ExamContent, AttemptError> {
        if actor.role == UserRole::Student {
            return Err(AttemptError::Forbidden("Only teachers can create exams"));
        }
        validate_draft(&draft)?;

        let now = self.clock.now();
        let exam_id = Uuid::new_v4().to_string();

        let reading_texts: Vec<ReadingText> = draft
            .reading_texts
            .iter()
            .enumerate()
            .map(|(index, text)| ReadingText {
                id: Uuid::new_v4().to_string(),
                exam_id: exam_id.clone(),
                order_index: index as i32,
                title: text.title.clone(),
                body: text.body.clone(),
            })
            .collect();

        let questions: Vec<Question> = draft
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let options: Vec<QuestionOption> = question
                    .options
                    .iter()
                    .map(|text| QuestionOption { id: Uuid::new_v4().to_string(), text: text.clone() })
                    .collect();
                let correct_option_id = question
                    .correct_option
                    .and_then(|position| options.get(position))
                    .map(|option| option.id.clone());

                Question {
                    id: Uuid::new_v4().to_string(),
                    exam_id: exam_id.clone(),
                    order_index: index as i32,
                    question_type: question.question_type,
                    prompt: question.prompt.clone(),
                    points: question.points,
                    options: Json(options),
                    correct_option_id,
                    model_answer: question.model_answer.clone(),
                    reading_text_id: question
                        .reading_text
                        .and_then(|position| reading_texts.get(position))
                        .map(|text| text.id.clone()),
                }
            })
            .collect();

        let exam = Exam {
            id: exam_id,
            owner_id: actor.user_id.clone(),
            title: draft.title,
            description: draft.description,
            status: ExamStatus::Draft,
            duration_minutes: draft.duration_minutes,
            price_cents: draft.price_cents,
            prize_pool_cents: draft.prize_pool_cents,
            prize_shares_bps: Json(draft.prize_shares_bps),
            rank_timed_out: draft.rank_timed_out,
            created_at: now,
            updated_at: now,
            published_at: None,
        };

        let content = ExamContent { exam, reading_texts, questions };
        self.store.create_exam(&content).await?;

        tracing::info!(
            exam_id = %content.exam.id,
            owner_id = %actor.user_id,
            questions = content.questions.len(),
            "Exam drafted"
        );
        Ok(content)
    }

    /// Drafts are visible only to the people managing them.
    pub(crate) async fn get_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> Result<ExamContent, AttemptError> {
        let content = self
            .store
            .load_exam_content(exam_id)
            .await?
            .ok_or(AttemptError::NotFound("Exam not found"))?;

        if content.exam.status == ExamStatus::Draft && !actor.manages(&content.exam) {
            return Err(AttemptError::NotFound("Exam not found"));
        }

        Ok(content)
    }

    pub(crate) async fn publish_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> Result<Exam, AttemptError> {
        self.move_exam(actor, exam_id, ExamStatus::Draft, ExamStatus::Published).await
    }

    pub(crate) async fn archive_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> Result<Exam, AttemptError> {
        self.move_exam(actor, exam_id, ExamStatus::Published, ExamStatus::Archived).await
    }

    async fn move_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
        from: ExamStatus,
        to: ExamStatus,
    ) -> Result<Exam, AttemptError> {
        let exam = self.managed_exam(actor, exam_id).await?;
        if exam.status != from {
            return Err(AttemptError::Conflict(match to {
                ExamStatus::Published => "Only draft exams can be published",
                ExamStatus::Archived => "Only published exams can be archived",
                ExamStatus::Draft => "Exams cannot return to draft",
            }));
        }

        if to == ExamStatus::Published {
            let content = self
                .store
                .load_exam_content(exam_id)
                .await?
                .ok_or(AttemptError::NotFound("Exam not found"))?;
            if content.questions.is_empty() {
                return Err(AttemptError::validation("Exam has no questions"));
            }
        }

        let now = self.clock.now();
        if !self.store.transition_exam(exam_id, from, to, now).await? {
            return Err(AttemptError::Conflict("Exam status changed concurrently"));
        }

        tracing::info!(exam_id, from = ?from, to = ?to, actor_id = %actor.user_id, "Exam status changed");

        self.store.find_exam(exam_id).await?.ok_or(AttemptError::NotFound("Exam not found"))
    }

    pub(super) async fn managed_exam(
        &self,
        actor: &Actor,
        exam_id: &str,
    ) -> Result<Exam, AttemptError> {
        let exam =
            self.store.find_exam(exam_id).await?.ok_or(AttemptError::NotFound("Exam not found"))?;
        if !actor.manages(&exam) {
            return Err(AttemptError::Forbidden("Not enough permissions for this exam"));
        }
        Ok(exam)
    }
}

pub(super) fn validate_draft(draft: &ExamDraft) -> Result<(), AttemptError> {
    if draft.title.trim().is_empty() {
        return Err(AttemptError::validation("title must not be empty"));
    }
    if draft.duration_minutes <= 0 {
        return Err(AttemptError::validation("duration_minutes must be positive"));
    }
    if draft.price_cents < 0 || draft.prize_pool_cents < 0 {
        return Err(AttemptError::validation("amounts must not be negative"));
    }

    let total_bps: u64 = draft.prize_shares_bps.iter().map(|share| u64::from(*share)).sum();
    if total_bps > u64::from(MAX_SHARES_BPS) {
        return Err(AttemptError::validation("prize shares exceed 10000 basis points"));
    }
    if draft.questions.is_empty() {
        return Err(AttemptError::validation("exam needs at least one question"));
    }

    for (index, question) in draft.questions.iter().enumerate() {
        validate_question(question, draft.reading_texts.len())
            .map_err(|message| AttemptError::validation(format!("question {index}: {message}")))?;
    }

    Ok(())
}

fn validate_question(question: &QuestionDraft, reading_texts: usize) -> Result<(), &'static str> {
    if question.prompt.trim().is_empty() {
        return Err("prompt must not be empty");
    }
    if !question.points.is_finite() || question.points < 0.0 {
        return Err("points must be a non-negative number");
    }
    if question.reading_text.is_some_and(|position| position >= reading_texts) {
        return Err("reading text reference is out of range");
    }
    if question.options.iter().any(|option| option.trim().is_empty()) {
        return Err("options must not be empty");
    }

    let has_options = !question.options.is_empty();
    let correct_in_range =
        question.correct_option.is_some_and(|position| position < question.options.len());

    match question.question_type {
        QuestionType::MultipleChoice => {
            if question.options.len() < 2 {
                return Err("multiple choice needs at least two options");
            }
            if !correct_in_range {
                return Err("multiple choice needs a correct option");
            }
        }
        QuestionType::ReadingComprehension => {
            if question.reading_text.is_none() {
                return Err("reading comprehension needs a reading text");
            }
            if has_options && (question.options.len() < 2 || !correct_in_range) {
                return Err("choice reading comprehension needs two options and a correct one");
            }
            if !has_options && question.correct_option.is_some() {
                return Err("correct option given without options");
            }
        }
        QuestionType::OpenEnded => {
            if has_options || question.correct_option.is_some() {
                return Err("open ended questions take no options");
            }
        }
    }

    Ok(())
}
