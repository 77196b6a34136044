use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStudent, CurrentUser};
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::schemas::attempt::AttemptResponse;
use crate::schemas::exam::{ExamCreate, ExamDetailResponse, ExamResponse};
use crate::schemas::leaderboard::{LeaderboardResponse, PrizePayoutResponse};

pub(super) async fn create_exam(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamDetailResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let content = state.exams().create_exam(&actor, payload.into()).await?;

    Ok((StatusCode::CREATED, Json(ExamDetailResponse::from_content(content, true))))
}

pub(super) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamDetailResponse>, ApiError> {
    let content = state.exams().get_exam(&actor, &exam_id).await?;
    let reveal_keys = actor.manages(&content.exam);

    Ok(Json(ExamDetailResponse::from_content(content, reveal_keys)))
}

pub(super) async fn publish_exam(
    Path(exam_id): Path<String>,
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = state.exams().publish_exam(&actor, &exam_id).await?;
    Ok(Json(exam.into()))
}

pub(super) async fn archive_exam(
    Path(exam_id): Path<String>,
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = state.exams().archive_exam(&actor, &exam_id).await?;
    Ok(Json(exam.into()))
}

pub(super) async fn start_attempt(
    Path(exam_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    let attempt = state.exams().start_attempt(&exam_id, &student.user_id).await?;
    Ok((StatusCode::CREATED, Json(attempt.into())))
}

pub(super) async fn leaderboard(
    Path(exam_id): Path<String>,
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let requesting = match actor.role {
        UserRole::Student => Some(actor.user_id.as_str()),
        UserRole::Teacher | UserRole::Admin => None,
    };

    let data = state.exams().leaderboard(&exam_id, requesting).await?;
    Ok(Json(data.into()))
}

pub(super) async fn award_prizes(
    Path(exam_id): Path<String>,
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PrizePayoutResponse>, ApiError> {
    let payout = state.exams().award_prizes(&actor, &exam_id).await?;
    Ok(Json(payout.into()))
}
