use std::collections::HashMap;

use crate::db::models::{Answer, SnapshotQuestion};
use crate::db::types::{GradeState, GradingMode, GradingStatus};

/// Grade of one snapshot question at the moment an attempt closes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoredAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_awarded: Option<f64>,
    pub(crate) grade_state: GradeState,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreSheet {
    pub(crate) answers: Vec<ScoredAnswer>,
    pub(crate) score: f64,
    pub(crate) total_score: f64,
    pub(crate) grading_status: GradingStatus,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub(crate) enum ManualGradeError {
    #[error("question is graded automatically")]
    NotManual,
    #[error("points must be between 0 and {max}")]
    OutOfRange { max: f64 },
}

pub(crate) fn total_points(snapshot: &[SnapshotQuestion]) -> f64 {
    snapshot.iter().map(|question| question.points).sum()
}

/// Scores every snapshot question against the stored answers. Questions without
/// an answer still produce a row so that manual grading can target them.
pub(crate) fn score_attempt(snapshot: &[SnapshotQuestion], answers: &[Answer]) -> ScoreSheet {
    let by_question: HashMap<&str, &Answer> =
        answers.iter().map(|answer| (answer.question_id.as_str(), answer)).collect();

    let scored: Vec<ScoredAnswer> = snapshot
        .iter()
        .map(|question| score_question(question, by_question.get(question.question_id.as_str())))
        .collect();

    let (score, grading_status) =
        summarize(scored.iter().map(|answer| (answer.points_awarded, answer.grade_state)));

    ScoreSheet { answers: scored, score, total_score: total_points(snapshot), grading_status }
}

fn score_question(question: &SnapshotQuestion, answer: Option<&&Answer>) -> ScoredAnswer {
    let selected_option_id = answer.and_then(|answer| answer.selected_option_id.clone());
    let content = answer.and_then(|answer| answer.content.clone());

    match question.grading_mode() {
        GradingMode::Auto => {
            let is_correct = match (&selected_option_id, &question.correct_option_id) {
                (Some(selected), Some(correct)) => selected == correct,
                _ => false,
            };
            ScoredAnswer {
                question_id: question.question_id.clone(),
                selected_option_id,
                content,
                is_correct: Some(is_correct),
                points_awarded: Some(if is_correct { question.points } else { 0.0 }),
                grade_state: GradeState::Auto,
            }
        }
        GradingMode::Manual => ScoredAnswer {
            question_id: question.question_id.clone(),
            selected_option_id,
            content,
            is_correct: None,
            points_awarded: None,
            grade_state: GradeState::PendingManual,
        },
    }
}

/// Aggregate score is the sum of known points; grading is complete once no
/// answer waits for a human.
pub(crate) fn summarize(
    grades: impl IntoIterator<Item = (Option<f64>, GradeState)>,
) -> (f64, GradingStatus) {
    let mut score = 0.0;
    let mut pending = false;

    for (points, state) in grades {
        score += points.unwrap_or(0.0);
        match state {
            GradeState::PendingManual | GradeState::Ungraded => pending = true,
            GradeState::Auto | GradeState::Manual => {}
        }
    }

    let status = if pending { GradingStatus::AwaitingManual } else { GradingStatus::Complete };
    (score, status)
}

/// Checks a manual grade and returns the resulting correctness flag.
pub(crate) fn check_manual_grade(
    question: &SnapshotQuestion,
    points: f64,
) -> Result<bool, ManualGradeError> {
    if question.grading_mode() != GradingMode::Manual {
        return Err(ManualGradeError::NotManual);
    }
    if !points.is_finite() || points < 0.0 || points > question.points {
        return Err(ManualGradeError::OutOfRange { max: question.points });
    }
    Ok(points >= question.points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::QuestionType;
    use time::macros::datetime;

    fn choice(id: &str, points: f64, correct: &str) -> SnapshotQuestion {
        SnapshotQuestion {
            question_id: id.to_string(),
            question_type: QuestionType::MultipleChoice,
            points,
            option_ids: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            correct_option_id: Some(correct.to_string()),
        }
    }

    fn open(id: &str, points: f64) -> SnapshotQuestion {
        SnapshotQuestion {
            question_id: id.to_string(),
            question_type: QuestionType::OpenEnded,
            points,
            option_ids: Vec::new(),
            correct_option_id: None,
        }
    }

    fn answer(question_id: &str, selected: Option<&str>, content: Option<&str>) -> Answer {
        let now = datetime!(2025-03-01 09:00:00);
        Answer {
            id: format!("ans-{question_id}"),
            attempt_id: "attempt-1".to_string(),
            question_id: question_id.to_string(),
            selected_option_id: selected.map(str::to_string),
            content: content.map(str::to_string),
            is_correct: None,
            points_awarded: None,
            grade_state: GradeState::Ungraded,
            graded_by: None,
            graded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn mixed_exam_scores_auto_and_leaves_open_pending() {
        let snapshot =
            vec![choice("q1", 1.0, "a"), choice("q2", 1.0, "b"), choice("q3", 1.0, "c"), open("q4", 2.0)];
        let answers =
            vec![answer("q1", Some("a"), None), answer("q2", Some("b"), None), answer("q3", Some("a"), None)];

        let sheet = score_attempt(&snapshot, &answers);

        assert_eq!(sheet.score, 2.0);
        assert_eq!(sheet.total_score, 5.0);
        assert_eq!(sheet.grading_status, GradingStatus::AwaitingManual);
        assert_eq!(sheet.answers.len(), 4);
        let open_row = &sheet.answers[3];
        assert_eq!(open_row.grade_state, GradeState::PendingManual);
        assert_eq!(open_row.points_awarded, None);
        assert_eq!(open_row.is_correct, None);
    }

    #[test]
    fn unanswered_auto_question_scores_zero() {
        let sheet = score_attempt(&[choice("q1", 3.0, "a")], &[]);

        assert_eq!(sheet.answers[0].is_correct, Some(false));
        assert_eq!(sheet.answers[0].points_awarded, Some(0.0));
        assert_eq!(sheet.score, 0.0);
        assert_eq!(sheet.grading_status, GradingStatus::Complete);
    }

    #[test]
    fn reading_comprehension_without_key_is_manual() {
        let question = SnapshotQuestion {
            question_id: "rc".to_string(),
            question_type: QuestionType::ReadingComprehension,
            points: 4.0,
            option_ids: Vec::new(),
            correct_option_id: None,
        };
        let sheet = score_attempt(&[question], &[answer("rc", None, Some("essay"))]);

        assert_eq!(sheet.answers[0].grade_state, GradeState::PendingManual);
        assert_eq!(sheet.answers[0].content.as_deref(), Some("essay"));
    }

    #[test]
    fn manual_grade_bounds() {
        let question = open("q4", 2.0);

        assert_eq!(check_manual_grade(&question, 2.0), Ok(true));
        assert_eq!(check_manual_grade(&question, 1.5), Ok(false));
        assert_eq!(check_manual_grade(&question, 2.5), Err(ManualGradeError::OutOfRange { max: 2.0 }));
        assert_eq!(check_manual_grade(&question, -1.0), Err(ManualGradeError::OutOfRange { max: 2.0 }));
        assert_eq!(check_manual_grade(&choice("q1", 1.0, "a"), 1.0), Err(ManualGradeError::NotManual));
    }

    #[test]
    fn summarize_counts_manual_points() {
        let (score, status) = summarize([
            (Some(1.0), GradeState::Auto),
            (Some(2.0), GradeState::Manual),
            (Some(0.0), GradeState::Auto),
        ]);

        assert_eq!(score, 3.0);
        assert_eq!(status, GradingStatus::Complete);
    }
}
