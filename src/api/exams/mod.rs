mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_exam))
        .route("/:exam_id", get(handlers::get_exam))
        .route("/:exam_id/publish", post(handlers::publish_exam))
        .route("/:exam_id/archive", post(handlers::archive_exam))
        .route("/:exam_id/attempts", post(handlers::start_attempt))
        .route("/:exam_id/leaderboard", get(handlers::leaderboard))
        .route("/:exam_id/prizes", post(handlers::award_prizes))
}
