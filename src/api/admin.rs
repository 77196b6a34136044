use axum::extract::State;
use axum::{routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::schemas::attempt::SweepResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/sweeps", post(run_sweep))
}

/// Same pass the worker runs on its interval.
async fn run_sweep(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<SweepResponse>, ApiError> {
    let report = state.exams().run_expiry_sweep().await?;
    tracing::info!(
        admin_id = %admin.user_id,
        scanned = report.scanned,
        processed = report.processed,
        "Manual expiry sweep"
    );
    Ok(Json(report.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use time::Duration;
    use tower::ServiceExt;

    use crate::db::types::{AttemptStatus, UserRole};
    use crate::test_support;

    #[tokio::test]
    async fn admin_sweep_times_out_expired_attempts() {
        let ctx = test_support::setup_test_context().await;
        test_support::seed_exam(&ctx.store, test_support::sample_exam("exam-1")).await;
        let attempt = ctx.state.exams().start_attempt("exam-1", "s1").await.expect("start");
        ctx.clock.advance(Duration::minutes(90));

        let student = test_support::bearer_token("s1", UserRole::Student, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/admin/sweeps",
                Some(&student),
                None,
            ))
            .await
            .expect("sweep");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = test_support::bearer_token("admin-1", UserRole::Admin, ctx.state.settings());
        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/admin/sweeps",
                Some(&admin),
                None,
            ))
            .await
            .expect("sweep");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["processed"], 1);
        assert_eq!(
            ctx.store.attempt(&attempt.id).expect("attempt").status,
            AttemptStatus::TimedOut
        );
    }
}
