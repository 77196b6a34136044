use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::exams::ExamService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    exams: ExamService,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        exams: ExamService,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, exams }) }
    }

    /// Production wiring: PostgreSQL-backed store and wallet ledger on the same pool.
    pub(crate) fn with_postgres(settings: Settings, db: PgPool, redis: RedisHandle) -> Self {
        let exams = ExamService::postgres(db.clone(), settings.attempts().clone());
        Self::new(settings, db, redis, exams)
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn exams(&self) -> &ExamService {
        &self.inner.exams
    }
}
