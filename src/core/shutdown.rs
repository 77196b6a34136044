use tokio::signal;

/// Resolves on the first SIGINT or SIGTERM.
pub(crate) async fn shutdown_signal() {
    tokio::select! {
        _ = interrupt() => tracing::info!(signal = "SIGINT", "Shutdown requested"),
        _ = terminate() => tracing::info!(signal = "SIGTERM", "Shutdown requested"),
    }
}

async fn interrupt() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
