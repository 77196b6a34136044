use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![tokio::spawn(expiry_sweep_loop(state.clone(), shutdown_rx.clone()))];

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

/// Times out attempts whose deadline passed without a request from the student.
pub(crate) async fn expiry_sweep_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().attempts().sweep_interval_seconds.max(1));
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_seconds = period.as_secs(), "Expiry sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                match state.exams().run_expiry_sweep().await {
                    Ok(report) => {
                        metrics::counter!("sweep_runs_total").increment(1);
                        tracing::debug!(
                            scanned = report.scanned,
                            processed = report.processed,
                            "Expiry sweep finished"
                        );
                    }
                    Err(err) => tracing::error!(error = %err, "run_expiry_sweep failed"),
                }
            }
        }
    }

    tracing::info!("Expiry sweeper stopped");
}

#[cfg(test)]
mod tests {
    use time::Duration as TimeDuration;

    use super::*;
    use crate::db::types::AttemptStatus;
    use crate::test_support::{sample_exam, seed_exam, setup_test_context};

    #[tokio::test]
    async fn sweeper_closes_expired_attempts_and_stops_on_shutdown() {
        let ctx = setup_test_context().await;
        seed_exam(&ctx.store, sample_exam("exam-1")).await;
        let attempt = ctx.state.exams().start_attempt("exam-1", "s1").await.expect("start");
        ctx.clock.advance(TimeDuration::hours(2));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(expiry_sweep_loop(ctx.state.clone(), shutdown_rx));

        let mut status = AttemptStatus::InProgress;
        for _ in 0..50 {
            status = ctx.store.attempt(&attempt.id).expect("attempt").status;
            if status != AttemptStatus::InProgress {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, AttemptStatus::TimedOut);

        shutdown_tx.send(true).expect("shutdown");
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper stops")
            .expect("join");
    }
}
