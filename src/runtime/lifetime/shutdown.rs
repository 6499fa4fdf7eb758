//! Graceful shutdown signal handling

use tracing::warn;

/// 等待关停信号（SIGINT / SIGTERM）
pub async fn listen_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("SIGINT received, shutting down");
            }
            _ = sigterm.recv() => {
                warn!("SIGTERM received, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        warn!("Ctrl-C received, shutting down");
    }
}
