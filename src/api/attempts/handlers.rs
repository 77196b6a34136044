use axum::extract::{Path, State};
use axum::Json;
use redis::RedisError;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStudent, CurrentUser};
use crate::core::state::AppState;
use crate::schemas::attempt::{
    AttemptResultResponse, AttemptViewResponse, GradeAnswerRequest, SavedAnswersResponse,
    SubmitAnswersRequest, UpdatedScoreResponse,
};

pub(super) async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AttemptViewResponse>, ApiError> {
    let view = state.exams().get_attempt(&attempt_id, &student.user_id).await?;
    Ok(Json(view.into()))
}

pub(super) async fn submit_answers(
    Path(attempt_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<Json<SavedAnswersResponse>, ApiError> {
    let per_minute = state.settings().attempts().answer_rate_limit_per_minute;
    let verdict = state.redis().allow_answer_submission(&student.user_id, per_minute).await;
    admit_submission(&student.user_id, verdict)?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let saved = state
        .exams()
        .submit_answers(&attempt_id, &student.user_id, payload.into_answers())
        .await?;
    Ok(Json(saved.into()))
}

pub(super) async fn finalize_attempt(
    Path(attempt_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    let result = state.exams().finalize_attempt(&attempt_id, &student.user_id).await?;
    Ok(Json(result.into()))
}

pub(super) async fn grade_answer(
    Path((attempt_id, answer_id)): Path<(String, String)>,
    CurrentUser(grader): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<GradeAnswerRequest>,
) -> Result<Json<UpdatedScoreResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let updated =
        state.exams().grade_answer(&grader, &attempt_id, &answer_id, payload.points).await?;
    Ok(Json(updated.into()))
}

/// Fails open when the limiter itself is unavailable.
pub(super) fn admit_submission(
    student_id: &str,
    verdict: Result<bool, RedisError>,
) -> Result<(), ApiError> {
    match verdict {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::info!(student_id, "Answer submission rate limited");
            Err(ApiError::TooManyRequests("Too many answer submissions"))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Rate limiter unavailable; allowing answer submission");
            Ok(())
        }
    }
}
