use std::future::Future;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Resolves on SIGTERM or SIGINT (Ctrl+C on other platforms).
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("shutdown: SIGTERM received"),
            _ = sigint.recv()  => tracing::info!("shutdown: SIGINT received"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown: Ctrl+C received");
        Ok(())
    }
}

/// Token cancelled by the first shutdown signal.
pub fn shutdown_token() -> CancellationToken {
    cancel_when(wait_for_shutdown())
}

/// Token cancelled once `signal` resolves with `Ok`. An `Err` (signal handlers
/// could not be installed) is logged and leaves the token untouched.
fn cancel_when<F>(signal: F) -> CancellationToken
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => trigger.cancel(),
            Err(e) => tracing::error!(error = %e, "shutdown: failed to install signal handlers"),
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_cancels_token() {
        let token = cancel_when(async { Ok(()) });
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("token should be cancelled");
    }

    #[tokio::test]
    async fn handler_failure_keeps_token_alive() {
        let token = cancel_when(async { Err(anyhow::anyhow!("no signals here")) });
        let waited = tokio::time::timeout(Duration::from_millis(100), token.cancelled()).await;
        assert!(waited.is_err());
        assert!(!token.is_cancelled());
    }
}
