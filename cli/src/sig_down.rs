use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;
use tokio_util::sync::CancellationToken;

/// Returns a token that is cancelled on the first SIGTERM or SIGINT.
///
/// Long-running commands hand it to the poller so that Ctrl-C stops the wait
/// between two ledger calls instead of killing the process mid-request.
pub fn cancel_on_signal() -> Result<CancellationToken, std::io::Error> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
        #[cfg(feature = "telemetry")]
        tracing::info!("Shutdown signal received, cancelling");
        trigger.cancel();
    });
    Ok(token)
}
