//! OS termination signals.
//!
//! Handlers are installed while the process is still starting so a failure to
//! install them is reported before any listener is reachable.

use super::ShutdownHandle;
use tokio::signal;

pub struct Signals {
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

impl Signals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal::unix::signal(signal::unix::SignalKind::terminate())?,
        })
    }

    /// Resolves with the name of the first signal received.
    pub async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        let terminate = async {
            self.terminate.recv().await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("Cannot listen for Ctrl+C: {err}");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = ctrl_c => "SIGINT",
            () = terminate => "SIGTERM",
        }
    }

    /// Turns the first signal into a shutdown request. Returns early if the
    /// shutdown was requested some other way.
    pub async fn forward(mut self, handle: ShutdownHandle) {
        tokio::select! {
            name = self.recv() => {
                tracing::info!("Received {name}");
                handle.shutdown(name);
            }
            () = handle.cancelled() => {}
        }
    }
}
