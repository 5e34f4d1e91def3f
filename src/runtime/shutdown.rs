// src/runtime/shutdown.rs

use std::future::pending;

/// Resolves when the process receives SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// With `enabled == false`, or when no handler can be registered, the future
/// never resolves.
pub async fn termination_signal(enabled: bool) {
  if !enabled {
    return pending().await;
  }

  #[cfg(unix)]
  {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
      Ok(mut sigterm) => {
        tokio::select! {
          res = tokio::signal::ctrl_c() => {
            if res.is_err() {
              // SIGINT unavailable: fall back to SIGTERM alone.
              sigterm.recv().await;
            }
          }
          _ = sigterm.recv() => {}
        }
        tracing::info!("Termination signal received");
        return;
      }
      Err(e) => {
        tracing::warn!(error = %e, "Failed to register SIGTERM handler, watching SIGINT only");
      }
    }
  }

  match tokio::signal::ctrl_c().await {
    Ok(()) => tracing::info!("Termination signal received"),
    Err(e) => {
      tracing::warn!(error = %e, "Failed to register SIGINT handler, signals will be ignored");
      pending::<()>().await
    }
  }
}
