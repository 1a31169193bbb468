use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

/// Sender side held by the application orchestrator.
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

/// Receiver side handed to every subsystem that must stop on shutdown.
/// Each clone observes the signal independently.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Construct a linked handle/signal pair.
pub fn new_pair() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

impl ShutdownHandle {
    /// Broadcast shutdown to every outstanding [`ShutdownSignal`].
    pub fn trigger(self) {
        // Fails only when no receiver is left, in which case nobody is listening.
        let _ = self.tx.send(true);
    }
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered, immediately if it already was.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|&triggered| triggered).await;
    }
}

/// Wait for `SIGINT` (Ctrl-C) or `SIGTERM` (container stop).
///
/// Registration failures are returned so `app::run` can abort startup
/// instead of running without a way to stop cleanly.
pub async fn wait_for_os_signal() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv()  => tracing::info!("🔔 SIGINT received"),
        _ = sigterm.recv() => tracing::info!("🔔 SIGTERM received"),
    }
    Ok(())
}
