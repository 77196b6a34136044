use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!("attempts_started_total", "Attempts created");
    describe_counter!("attempts_finalized_total", "Attempts submitted by their owner");
    describe_counter!("attempts_timed_out_total", "Attempts closed at their deadline");
    describe_counter!("answers_upserted_total", "Answers written while attempts were open");
    describe_counter!(
        "attempt_refunds_failed_total",
        "Start payments that could not be refunded after the attempt was not created"
    );
    describe_counter!("manual_grades_total", "Manual grades applied to finished attempts");
    describe_counter!("prizes_credited_total", "Prize awards credited to wallets");
    describe_counter!("sweep_runs_total", "Completed expiry sweeps");
    describe_counter!("http_requests_total", "HTTP responses by status");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency by status"
    );
}
