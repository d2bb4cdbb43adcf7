/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!(signal = "SIGINT", "received signal, shutting down"),
                    _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "received signal, shutting down"),
                }
                return;
            }
            Err(err) => tracing::warn!(error = %err, "failed to install SIGTERM handler"),
        }
    }

    match ctrl_c.await {
        Ok(()) => tracing::info!(signal = "SIGINT", "received signal, shutting down"),
        // Without a working handler the only way out is killing the process.
        Err(err) => {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
