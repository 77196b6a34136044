mod handlers;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:attempt_id", get(handlers::get_attempt))
        .route("/:attempt_id/answers", put(handlers::submit_answers))
        .route("/:attempt_id/finalize", post(handlers::finalize_attempt))
        .route("/:attempt_id/answers/:answer_id/grade", put(handlers::grade_answer))
}
