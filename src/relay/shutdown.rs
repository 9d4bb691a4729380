use tokio::signal;
use tokio::sync::watch;

/// Latched stop flag for the relay. Set by [`ShutdownSignal::trigger`];
/// [`ShutdownSignal::wait`] also returns on Ctrl-C or SIGTERM.
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub async fn wait(&self) -> std::io::Result<()> {
        // A trigger before this point is still seen: the value is latched.
        let mut triggered = self.tx.subscribe();
        let requested = async move {
            let _ = triggered.wait_for(|stop| *stop).await;
        };

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                _ = requested => {},
                _ = signal::ctrl_c() => tracing::info!("Received Ctrl-C"),
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = requested => {},
                _ = signal::ctrl_c() => tracing::info!("Received Ctrl-C"),
            }
        }

        self.tx.send_replace(true);
        tracing::info!("Relay shutting down");
        Ok(())
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
